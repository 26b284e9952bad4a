/// Explicit `(min,max)` bounds written in a token.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: f32,
    pub max: f32,
}

impl Bounds {
    /// Bounds used when a token has no `(min,max)` group.
    pub const DEFAULT: Bounds = Bounds { min: 0.0, max: 1.0 };

    /// Halves before adding so bounds near `f32::MAX` stay finite.
    pub fn midpoint(&self) -> f32 {
        self.clamp(self.min * 0.5 + self.max * 0.5)
    }

    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }
}

/// One `$name[(min,max)[.initial]]` sighting, as produced by the token parser.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub bounds: Option<Bounds>,
    pub initial: Option<f32>,
}

impl Declaration {
    /// The value this declaration would start at if it created a new entry.
    pub fn start_value(&self) -> f32 {
        let bounds = self.bounds.unwrap_or(Bounds::DEFAULT);
        match self.initial {
            Some(v) => bounds.clamp(v),
            None => bounds.midpoint(),
        }
    }

    pub fn to_parameter(&self) -> Parameter {
        let bounds = self.bounds.unwrap_or(Bounds::DEFAULT);
        Parameter {
            name: self.name.clone(),
            min: bounds.min,
            max: bounds.max,
            value: self.start_value(),
        }
    }
}

/// A registered, user-tunable float.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub min: f32,
    pub max: f32,
    pub value: f32,
}

impl Parameter {
    pub fn bounds(&self) -> Bounds {
        Bounds {
            min: self.min,
            max: self.max,
        }
    }

    /// Identifier the parameter has inside compiled GLSL.
    pub fn uniform_name(&self) -> String {
        uniform_name(&self.name)
    }
}

pub fn uniform_name(name: &str) -> String {
    format!("_{name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn midpoint_of_default_bounds() {
        assert_eq!(Bounds::DEFAULT.midpoint(), 0.5);
    }

    #[test]
    fn midpoint_of_huge_bounds_stays_inside() {
        let b = Bounds { min: 3.0e38, max: 3.4e38 };
        let mid = b.midpoint();
        assert!(mid.is_finite());
        assert!(mid >= b.min && mid <= b.max);

        let b = Bounds { min: -f32::MAX, max: f32::MAX };
        assert_eq!(b.midpoint(), 0.0);
    }

    #[test]
    fn huge_bounds_parameter_value_is_in_range() {
        let d = Declaration {
            name: "a".into(),
            bounds: Some(Bounds { min: 3.0e38, max: 3.4e38 }),
            initial: None,
        };
        let p = d.to_parameter();
        assert!(p.value <= p.max && p.value >= p.min);
    }
}
