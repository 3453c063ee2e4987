use crate::models::TagCount;

/// Pairs each tag count with a class picked by its position between the
/// smallest and largest count.
///
/// `classes` is ordered from least to most used. The smallest count gets the
/// first class, the largest the last, and counts in between the nearest
/// class on a linear scale. When every count is equal they all get the first
/// class. Output keeps the order of `counts`; empty input or an empty class
/// list yields an empty cloud.
///
/// # Examples
///
/// ```
/// use taggable::{TagCount, TagId, tag_cloud};
///
/// let counts = vec![
///     TagCount::new(TagId::new(1), "Good", 2),
///     TagCount::new(TagId::new(2), "Nature", 5),
///     TagCount::new(TagId::new(3), "Bad", 1),
/// ];
/// let cloud = tag_cloud(&counts, &["css1", "css2", "css3", "css4"]);
///
/// let classes: Vec<_> = cloud.iter().map(|(tag, class)| (tag.name.as_str(), **class)).collect();
/// assert_eq!(classes, [("Good", "css2"), ("Nature", "css4"), ("Bad", "css1")]);
/// ```
pub fn tag_cloud<'a, C>(counts: &'a [TagCount], classes: &'a [C]) -> Vec<(&'a TagCount, &'a C)> {
    let (Some(min), Some(max)) = (
        counts.iter().map(|c| c.count).min(),
        counts.iter().map(|c| c.count).max(),
    ) else {
        return Vec::new();
    };
    if classes.is_empty() {
        return Vec::new();
    }

    let span = u128::from(max - min);
    let steps = (classes.len() - 1) as u128;

    counts
        .iter()
        .map(|tag| {
            let index = if span == 0 {
                0
            } else {
                // Round half up; u128 holds the product for any u64 counts.
                (u128::from(tag.count - min) * steps * 2 + span) / (span * 2)
            };
            (tag, &classes[index as usize])
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TagId;

    const CLASSES: [&str; 4] = ["css1", "css2", "css3", "css4"];

    fn counts(pairs: &[(&str, u64)]) -> Vec<TagCount> {
        pairs
            .iter()
            .enumerate()
            .map(|(i, (name, count))| TagCount::new(TagId::new(i as i64 + 1), *name, *count))
            .collect()
    }

    fn classes_of<'a>(cloud: &[(&'a TagCount, &'a &'static str)]) -> Vec<(&'a str, &'static str)> {
        cloud.iter().map(|(t, c)| (t.name.as_str(), **c)).collect()
    }

    #[test]
    fn classes_follow_linear_position() {
        let counts = counts(&[("Good", 2), ("Nature", 5), ("Question", 1), ("Bad", 1)]);
        let cloud = tag_cloud(&counts, &CLASSES);

        assert_eq!(
            classes_of(&cloud),
            [
                ("Good", "css2"),
                ("Nature", "css4"),
                ("Question", "css1"),
                ("Bad", "css1")
            ]
        );
    }

    #[test]
    fn equal_counts_share_the_first_class() {
        let counts = counts(&[("A", 3), ("B", 3)]);
        let cloud = tag_cloud(&counts, &CLASSES);
        assert_eq!(classes_of(&cloud), [("A", "css1"), ("B", "css1")]);
    }

    #[test]
    fn single_class_takes_everything() {
        let counts = counts(&[("A", 1), ("B", 9)]);
        let cloud = tag_cloud(&counts, &["only"]);
        assert!(cloud.iter().all(|(_, c)| **c == "only"));
    }

    #[test]
    fn extreme_counts_do_not_overflow() {
        let counts = counts(&[("Low", 0), ("Mid", u64::MAX / 2), ("High", u64::MAX)]);
        let cloud = tag_cloud(&counts, &CLASSES);
        assert_eq!(
            classes_of(&cloud),
            [("Low", "css1"), ("Mid", "css2"), ("High", "css4")]
        );
    }

    #[test]
    fn empty_inputs_yield_empty_cloud() {
        assert!(tag_cloud(&[], &CLASSES).is_empty());
        assert!(tag_cloud::<&str>(&counts(&[("A", 1)]), &[]).is_empty());
    }
}
