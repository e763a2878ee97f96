use crate::assert_interval;

/// A rule for decaying a hyperparameter once per episode
///
/// Implementations must never increase the value, so anything driven by a `Decay`
/// is monotonically non-increasing over a run.
pub trait Decay {
    /// The value after one more episode
    fn step(&self, value: f32) -> f32;
}

/// No decay at all
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Constant;

impl Decay for Constant {
    fn step(&self, value: f32) -> f32 {
        value
    }
}

/// v<sub>t+1</sub> = max(v<sub>t</sub> * factor, floor)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometric {
    factor: f32,
    floor: f32,
}

impl Geometric {
    /// **Panics** if `factor` or `floor` is not in the interval `[0,1]`
    pub fn new(factor: f32, floor: f32) -> Self {
        assert_interval!(factor, 0.0, 1.0);
        assert_interval!(floor, 0.0, 1.0);
        Self { factor, floor }
    }

    pub fn factor(&self) -> f32 {
        self.factor
    }

    pub fn floor(&self) -> f32 {
        self.floor
    }
}

impl Default for Geometric {
    /// Factor `0.995` per episode, floored at `0.05`
    fn default() -> Self {
        Self::new(0.995, 0.05)
    }
}

impl Decay for Geometric {
    fn step(&self, value: f32) -> f32 {
        (value * self.factor).max(self.floor).min(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_decay() {
        assert_eq!(Constant.step(0.3), 0.3);
    }

    #[test]
    fn geometric_decay() {
        let x = Geometric::new(0.5, 0.1);
        assert_eq!(x.step(0.8), 0.4);
        assert_eq!(x.step(0.15), 0.1, "floored");
        assert_eq!(x.step(0.05), 0.05, "never raised to the floor");
    }

    #[test]
    #[should_panic(expected = "Invalid value for `factor`")]
    fn geometric_rejects_growth() {
        Geometric::new(1.5, 0.0);
    }
}
