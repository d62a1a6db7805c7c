pub mod aggregate;
pub mod convert;
pub mod sequence;
pub mod surface;

pub mod errors {
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum EngineError {
        #[error("无效的铣平参数: {0}")]
        InvalidSurface(String),
        #[error("未知的铣平方式 `{0}`")]
        UnknownSurfaceMethod(String),
    }
}

pub mod job {
    use tracing::debug;

    use cnc_core::document::Document;
    use cnc_core::geometry::{Bounds2D, Point2};
    use cnc_core::linkable::{Linkable, Path};

    use crate::aggregate::build_paths;
    use crate::convert::{Conversion, convert};
    use crate::sequence::{any, sort_entities};

    /// 加工计划：按加工顺序排列的图元及其包围盒（用于解析相对原点）。
    #[derive(Debug, Clone, PartialEq)]
    pub struct Plan<T> {
        pub items: Vec<T>,
        pub bounds: Option<Bounds2D>,
    }

    impl<T> Plan<T> {
        #[inline]
        pub fn len(&self) -> usize {
            self.items.len()
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.items.is_empty()
        }
    }

    /// 单个文件的加工任务，持有文档与图层过滤条件。每个文件都重新构建。
    #[derive(Debug)]
    pub struct Job {
        document: Document,
        layers: Vec<String>,
    }

    impl Job {
        pub fn new(document: Document, layers: Vec<String>) -> Self {
            Self { document, layers }
        }

        #[inline]
        pub fn document(&self) -> &Document {
            &self.document
        }

        /// 实际参与加工的图层：配置图层，或文档中全部图层（已排序）。
        pub fn selected_layers(&self) -> Vec<String> {
            if self.layers.is_empty() {
                self.document.layer_names()
            } else {
                self.layers.clone()
            }
        }

        pub fn conversion(&self) -> Conversion {
            convert(&self.document, &self.layers)
        }

        /// 钻孔计划：只取点，从 (0,0) 出发按距离贪心排序。
        pub fn drill_plan(&self) -> Plan<Linkable> {
            let (points, _) = self.conversion().partition();
            let bounds = points.bounds;
            let sequenced = sort_entities(points.linkables, Some(Point2::ORIGIN), any);
            debug!(points = sequenced.ordered.len(), "钻孔计划完成");
            Plan {
                items: sequenced.ordered,
                bounds,
            }
        }

        /// 雕刻计划：点以外的图形聚合成互不相交的路径。
        pub fn engrave_plan(&self) -> Plan<Path> {
            let (_, shapes) = self.conversion().partition();
            let bounds = shapes.bounds;
            let paths = build_paths(shapes.linkables);
            debug!(paths = paths.len(), "雕刻计划完成");
            Plan {
                items: paths,
                bounds,
            }
        }
    }

}
