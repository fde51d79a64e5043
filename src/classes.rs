//! Grouping of training instances by class label

/// Instances grouped by class.
///
/// Class `k` has the external label `label[k]`; its instances are
/// `perm[start[k]..start[k] + count[k]]`.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedClasses {
    /// External label of each class
    pub label: Vec<i32>,
    /// Offset of each class in `perm`
    pub start: Vec<usize>,
    /// Number of instances of each class
    pub count: Vec<usize>,
    /// Instance indexes ordered by class
    pub perm: Vec<usize>,
}

impl GroupedClasses {
    /// Number of classes.
    pub fn nr_class(&self) -> usize {
        self.label.len()
    }

    /// Instances of class `k`.
    pub fn members(&self, k: usize) -> &[usize] {
        &self.perm[self.start[k]..self.start[k] + self.count[k]]
    }
}

/// Groups the instances by their (integer) label.
///
/// Classes are numbered in order of first appearance, except that a binary
/// problem labelled `-1` and `+1` always gets `+1` as its first class.
pub fn group_classes(labels: &[f64]) -> GroupedClasses {
    let mut label: Vec<i32> = Vec::new();
    let mut count: Vec<usize> = Vec::new();
    let mut data_label = vec![0usize; labels.len()];

    for (i, &yi) in labels.iter().enumerate() {
        let this_label = yi as i32;
        if let Some(pos) = label.iter().position(|&lab| lab == this_label) {
            count[pos] += 1;
            data_label[i] = pos;
        } else {
            data_label[i] = label.len();
            label.push(this_label);
            count.push(1);
        }
    }

    if label.len() == 2 && label[0] == -1 && label[1] == 1 {
        label.swap(0, 1);
        count.swap(0, 1);
        for dl in data_label.iter_mut() {
            *dl ^= 1;
        }
    }

    let mut start = vec![0usize; label.len()];
    for k in 1..label.len() {
        start[k] = start[k - 1] + count[k - 1];
    }

    let mut next = start.clone();
    let mut perm = vec![0usize; labels.len()];
    for (i, &k) in data_label.iter().enumerate() {
        perm[next[k]] = i;
        next[k] += 1;
    }

    GroupedClasses {
        label,
        start,
        count,
        perm,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_appearance_order() {
        let g = group_classes(&[3.0, 1.0, 3.0, 2.0, 1.0, 3.0]);
        assert_eq!(g.label, vec![3, 1, 2]);
        assert_eq!(g.count, vec![3, 2, 1]);
        assert_eq!(g.start, vec![0, 3, 5]);
        assert_eq!(g.perm, vec![0, 2, 5, 1, 4, 3]);
        assert_eq!(g.members(1), &[1, 4]);
    }

    #[test]
    fn positive_class_comes_first() {
        let g = group_classes(&[-1.0, 1.0, -1.0, 1.0, 1.0]);
        assert_eq!(g.label, vec![1, -1]);
        assert_eq!(g.count, vec![3, 2]);
        assert_eq!(g.members(0), &[1, 3, 4]);
        assert_eq!(g.members(1), &[0, 2]);
    }

    #[test]
    fn other_binary_labels_keep_order() {
        let g = group_classes(&[0.0, 1.0, 0.0]);
        assert_eq!(g.label, vec![0, 1]);
        let g = group_classes(&[1.0, -1.0]);
        assert_eq!(g.label, vec![1, -1]);
    }
}
