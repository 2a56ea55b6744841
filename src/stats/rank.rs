// ---------------------------------------------------------------------------
// Ranking helpers shared by Spearman and Kendall
// ---------------------------------------------------------------------------

/// Indices of `values` in ascending order.
fn argsort(values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    order
}

/// 1-based ranks; tied values share the mean of the ranks they span.
pub fn rank_average(values: &[f64]) -> Vec<f64> {
    let order = argsort(values);
    let mut ranks = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i + 1;
        while j < order.len() && values[order[j]] == values[order[i]] {
            j += 1;
        }
        // positions i..j hold ranks i+1..=j
        let avg = (i + 1 + j) as f64 / 2.0;
        for &k in &order[i..j] {
            ranks[k] = avg;
        }
        i = j;
    }
    ranks
}

/// Sizes of every group of tied values (groups of one are omitted).
pub fn tie_groups(values: &[f64]) -> Vec<usize> {
    let order = argsort(values);
    let mut groups = Vec::new();
    let mut i = 0;
    while i < order.len() {
        let mut j = i + 1;
        while j < order.len() && values[order[j]] == values[order[i]] {
            j += 1;
        }
        if j - i > 1 {
            groups.push(j - i);
        }
        i = j;
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_values() {
        assert_eq!(rank_average(&[3.0, 1.0, 2.0]), vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn ties_get_average_rank() {
        assert_eq!(
            rank_average(&[10.0, 20.0, 10.0, 30.0]),
            vec![1.5, 3.0, 1.5, 4.0]
        );
        assert_eq!(rank_average(&[5.0, 5.0, 5.0]), vec![2.0, 2.0, 2.0]);
    }

    #[test]
    fn tie_group_sizes() {
        assert_eq!(tie_groups(&[1.0, 2.0, 1.0, 3.0, 3.0, 3.0]), vec![2, 3]);
        assert!(tie_groups(&[1.0, 2.0, 3.0]).is_empty());
    }
}
