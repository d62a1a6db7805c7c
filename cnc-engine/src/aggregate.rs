//! 把相连的图元聚合成互不相交的加工路径。

use tracing::debug;

use cnc_core::linkable::{Linkable, Path};

use crate::sequence::{Sequenced, sort_entities, touching};

/// 反复对剩余图元做无锚点、相连约束的排序，每一轮得到一条极大路径。
///
/// 每个输入图元恰好出现在一条路径中；路径顺序取决于各连通分量首个图元的输入顺序。
pub fn build_paths(entities: Vec<Linkable>) -> Vec<Path> {
    let mut remaining = entities;
    let mut paths = Vec::new();

    while !remaining.is_empty() {
        let Sequenced {
            ordered,
            remaining: rest,
        } = sort_entities(remaining, None, touching);
        remaining = rest;
        if let Some(path) = Path::new(ordered) {
            paths.push(path);
        }
    }

    debug!(paths = paths.len(), "路径聚合完成");
    paths
}
