//! 贪心最近邻排序。
//!
//! 待排序图元放在 `remaining` 中，每一步把选中的图元按值移出并接到链的一端，
//! 同一图元不会同时出现在两处。

use std::collections::VecDeque;

use tracing::debug;

use cnc_core::{
    geometry::Point2,
    linkable::{Linkable, weight_from},
};

/// 排序结果：连成的链与未被选中的剩余图元（保持原有顺序）。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sequenced {
    pub ordered: Vec<Linkable>,
    pub remaining: Vec<Linkable>,
}

/// 两端任一端点与参考点重合即视为相连。
pub fn touching(reference: Point2, candidate: &Linkable) -> bool {
    reference.approx_eq(candidate.start()) || reference.approx_eq(candidate.end())
}

/// 不限制连通性，只按距离排序（钻孔）。
pub fn any(_reference: Point2, _candidate: &Linkable) -> bool {
    true
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    index: usize,
    score: f64,
}

/// 按端点距离排序。
///
/// 给定 `anchor` 时只从锚点向后生长；否则以第一个图元为种子，每一步在链尾和链首
/// 各找一个最近的合格候选，取得分更小的一侧（相等时取链尾）。
pub fn sort_entities<F>(entities: Vec<Linkable>, anchor: Option<Point2>, filter: F) -> Sequenced
where
    F: Fn(Point2, &Linkable) -> bool,
{
    let mut remaining = entities;
    let mut chain: VecDeque<Linkable> = VecDeque::with_capacity(remaining.len());

    match anchor {
        Some(anchor) => {
            let mut tail = anchor;
            while let Some(candidate) = closest(&remaining, tail, &filter) {
                let next = append_oriented(remaining.remove(candidate.index), tail);
                tail = next.end();
                chain.push_back(next);
            }
        }
        None if !remaining.is_empty() => {
            let seed = remaining.remove(0);
            let mut head = seed.start();
            let mut tail = seed.end();
            chain.push_back(seed);

            loop {
                let after = closest(&remaining, tail, &filter);
                let before = closest(&remaining, head, &filter);
                match (after, before) {
                    (None, None) => break,
                    (Some(after), Some(before)) if before.score < after.score => {
                        let next = prepend_oriented(remaining.remove(before.index), head);
                        head = next.start();
                        chain.push_front(next);
                    }
                    (Some(after), _) => {
                        let next = append_oriented(remaining.remove(after.index), tail);
                        tail = next.end();
                        chain.push_back(next);
                    }
                    (None, Some(before)) => {
                        let next = prepend_oriented(remaining.remove(before.index), head);
                        head = next.start();
                        chain.push_front(next);
                    }
                }
            }
        }
        None => {}
    }

    debug!(
        ordered = chain.len(),
        remaining = remaining.len(),
        anchored = anchor.is_some(),
        "排序完成"
    );
    Sequenced {
        ordered: chain.into(),
        remaining,
    }
}

/// 按到参考点的最短端点距离稳定排序，返回第一个通过过滤的候选。
fn closest<F>(remaining: &[Linkable], reference: Point2, filter: &F) -> Option<Candidate>
where
    F: Fn(Point2, &Linkable) -> bool,
{
    let mut scored: Vec<Candidate> = remaining
        .iter()
        .enumerate()
        .map(|(index, candidate)| {
            let [to_start, to_end] = weight_from(reference, candidate);
            Candidate {
                index,
                score: to_start.min(to_end),
            }
        })
        .collect();
    scored.sort_by(|left, right| left.score.total_cmp(&right.score));
    scored
        .into_iter()
        .find(|candidate| filter(reference, &remaining[candidate.index]))
}

/// 接在链尾：终点离链尾更近时反向，保证起点贴着链尾。
fn append_oriented(mut next: Linkable, tail: Point2) -> Linkable {
    let [to_start, to_end] = weight_from(tail, &next);
    if to_end < to_start {
        next.revert();
    }
    next
}

/// 接在链首：起点离链首更近时反向，保证终点贴着链首。
fn prepend_oriented(mut next: Linkable, head: Point2) -> Linkable {
    let [to_start, to_end] = weight_from(head, &next);
    if to_start < to_end {
        next.revert();
    }
    next
}

#[cfg(test)]
mod tests {
    use cnc_core::linkable::{Point, Segment};

    use super::*;

    fn segment(name: &str, start: (f64, f64), end: (f64, f64)) -> Linkable {
        Segment::new(
            name,
            Point2::new(start.0, start.1),
            Point2::new(end.0, end.1),
        )
        .into()
    }

    fn point(name: &str, x: f64, y: f64) -> Linkable {
        Point::new(name, Point2::new(x, y)).into()
    }

    fn names(linkables: &[Linkable]) -> Vec<&str> {
        linkables.iter().filter_map(Linkable::name).collect()
    }

    #[test]
    fn empty_input_gives_empty_result() {
        let result = sort_entities(Vec::new(), None, touching);
        assert!(result.ordered.is_empty());
        assert!(result.remaining.is_empty());

        let result = sort_entities(Vec::new(), Some(Point2::ORIGIN), any);
        assert!(result.ordered.is_empty());
    }

    #[test]
    fn single_entity_without_anchor() {
        let result = sort_entities(vec![segment("a", (0.0, 0.0), (1.0, 0.0))], None, touching);
        assert_eq!(names(&result.ordered), vec!["a"]);
        assert!(result.remaining.is_empty());
    }

    #[test]
    fn touching_chain_is_continuous_in_both_directions() {
        // 种子位于链中间，且部分线段方向相反
        let input = vec![
            segment("c", (2.0, 0.0), (3.0, 0.0)),
            segment("e", (5.0, 0.0), (4.0, 0.0)),
            segment("a", (1.0, 0.0), (0.0, 0.0)),
            segment("b", (1.0, 0.0), (2.0, 0.0)),
            segment("d", (3.0, 0.0), (4.0, 0.0)),
            segment("far", (50.0, 50.0), (60.0, 50.0)),
        ];
        let result = sort_entities(input, None, touching);

        assert_eq!(names(&result.ordered), vec!["a", "b", "c", "d", "e"]);
        for pair in result.ordered.windows(2) {
            assert!(pair[0].end().approx_eq(pair[1].start()));
        }
        assert_eq!(result.ordered[0].start(), Point2::new(0.0, 0.0));
        assert_eq!(result.ordered[4].end(), Point2::new(5.0, 0.0));
        assert_eq!(names(&result.remaining), vec!["far"]);
    }

    #[test]
    fn tolerance_allows_small_gaps() {
        let input = vec![
            segment("a", (0.0, 0.0), (1.0, 0.0)),
            segment("b", (1.001, 0.0), (2.0, 0.0)),
            segment("c", (2.1, 0.0), (3.0, 0.0)),
        ];
        let result = sort_entities(input, None, touching);
        assert_eq!(names(&result.ordered), vec!["a", "b"]);
        assert_eq!(names(&result.remaining), vec!["c"]);
    }

    #[test]
    fn anchor_orders_points_by_proximity() {
        let input = vec![
            point("far", 10.0, 10.0),
            point("near", 1.0, 0.0),
            point("middle", 4.0, 0.0),
        ];
        let result = sort_entities(input, Some(Point2::ORIGIN), any);
        assert_eq!(names(&result.ordered), vec!["near", "middle", "far"]);
        assert!(result.remaining.is_empty());
    }

    #[test]
    fn anchor_only_grows_after() {
        let input = vec![
            segment("a", (5.0, 0.0), (0.0, 0.0)),
            segment("b", (5.0, 0.0), (5.0, 5.0)),
        ];
        let result = sort_entities(input, Some(Point2::ORIGIN), touching);
        assert_eq!(names(&result.ordered), vec!["a", "b"]);
        assert_eq!(result.ordered[0].start(), Point2::ORIGIN);
        assert_eq!(result.ordered[1].end(), Point2::new(5.0, 5.0));
    }

    #[test]
    fn anchor_with_nothing_touching_leaves_everything() {
        let input = vec![segment("a", (5.0, 0.0), (6.0, 0.0))];
        let result = sort_entities(input, Some(Point2::ORIGIN), touching);
        assert!(result.ordered.is_empty());
        assert_eq!(names(&result.remaining), vec!["a"]);
    }

    #[test]
    fn chain_grows_at_both_ends() {
        // 链为 (0,0)->(10,0)，两侧各有一个相连候选，得分相同时先接链尾
        let input = vec![
            segment("seed", (0.0, 0.0), (10.0, 0.0)),
            segment("before", (-5.0, 0.0), (0.0, 0.0)),
            segment("after", (10.0, 0.0), (15.0, 0.0)),
        ];
        let result = sort_entities(input, None, touching);
        assert_eq!(names(&result.ordered), vec!["before", "seed", "after"]);

        let input = vec![
            segment("seed", (0.0, 0.0), (10.0, 0.0)),
            point("p", 10.0, 0.0),
            point("q", 0.0, 0.0),
        ];
        let result = sort_entities(input, None, touching);
        assert_eq!(names(&result.ordered), vec!["q", "seed", "p"]);
    }
}
