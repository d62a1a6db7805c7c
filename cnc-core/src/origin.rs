//! 刀具原点：绝对坐标，或相对于图形包围盒最小角的偏移。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ParseError;
use crate::geometry::{Bounds2D, Point2, Vector2};

/// 文本形式为 `x,y`（绝对）或 `@x,y`（相对包围盒）。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Origin {
    pub value: Point2,
    pub relative: bool,
}

impl Origin {
    pub fn absolute(x: f64, y: f64) -> Self {
        Self {
            value: Point2::new(x, y),
            relative: false,
        }
    }

    pub fn relative(x: f64, y: f64) -> Self {
        Self {
            value: Point2::new(x, y),
            relative: true,
        }
    }

    /// 求出输出坐标需要减去的偏移量。相对原点在没有包围盒时按绝对处理。
    pub fn resolve(&self, bounds: Option<&Bounds2D>) -> Vector2 {
        match bounds {
            Some(bounds) if self.relative && !bounds.is_empty() => {
                Vector2(self.value.as_vec2() + bounds.min().as_vec2())
            }
            _ => Vector2(self.value.as_vec2()),
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = if self.relative { "@" } else { "" };
        write!(f, "{prefix}{},{}", self.value.x(), self.value.y())
    }
}

impl FromStr for Origin {
    type Err = ParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let (relative, coordinates) = match trimmed.strip_prefix('@') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let value = coordinates.parse::<Point2>()?;
        Ok(Self { value, relative })
    }
}

impl TryFrom<String> for Origin {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Origin> for String {
    fn from(value: Origin) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_origin_adds_box_min() {
        let bounds = Bounds2D::new(Point2::new(3.0, 4.0), Point2::new(10.0, 12.0));
        let relative = Origin::relative(1.0, 1.0);
        assert_eq!(relative.resolve(Some(&bounds)), Vector2::new(4.0, 5.0));

        let absolute = Origin::absolute(1.0, 1.0);
        assert_eq!(absolute.resolve(Some(&bounds)), Vector2::new(1.0, 1.0));
    }

    #[test]
    fn relative_origin_without_box_is_absolute() {
        let relative = Origin::relative(2.0, -3.0);
        assert_eq!(relative.resolve(None), Vector2::new(2.0, -3.0));
        assert_eq!(
            relative.resolve(Some(&Bounds2D::empty())),
            Vector2::new(2.0, -3.0)
        );
    }

    #[test]
    fn parses_and_formats_text_form() {
        let origin: Origin = "@1.5, 2".parse().expect("relative origin");
        assert!(origin.relative);
        assert_eq!(origin.value, Point2::new(1.5, 2.0));
        assert_eq!(origin.to_string(), "@1.5,2");

        let origin: Origin = "0,0".parse().expect("absolute origin");
        assert_eq!(origin, Origin::default());
        assert!("@1".parse::<Origin>().is_err());
    }
}
