//! Band-math expression trees.
//!
//! Expressions are built locally and rendered to numexpr syntax for the
//! remote tiler, which evaluates them per pixel. [`Expr::eval`] evaluates the
//! same tree against a single sample so formulas can be checked offline.
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Reference to a catalog asset holding one band.
    Band(String),
    Const(f64),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Pow(Box<Expr>, Box<Expr>),
    Log10(Box<Expr>),
}

impl Expr {
    pub fn band(name: &str) -> Self {
        Expr::Band(name.to_string())
    }

    pub fn sub(self, rhs: Expr) -> Self {
        Expr::Sub(Box::new(self), Box::new(rhs))
    }

    pub fn mul(self, rhs: Expr) -> Self {
        Expr::Mul(Box::new(self), Box::new(rhs))
    }

    pub fn div(self, rhs: Expr) -> Self {
        Expr::Div(Box::new(self), Box::new(rhs))
    }

    pub fn pow(self, rhs: Expr) -> Self {
        Expr::Pow(Box::new(self), Box::new(rhs))
    }

    pub fn log10(self) -> Self {
        Expr::Log10(Box::new(self))
    }

    /// Evaluate with band values taken from `sample`. `None` if a referenced band is absent.
    pub fn eval(&self, sample: &HashMap<String, f64>) -> Option<f64> {
        let value = match self {
            Expr::Band(name) => *sample.get(name)?,
            Expr::Const(c) => *c,
            Expr::Sub(lhs, rhs) => lhs.eval(sample)? - rhs.eval(sample)?,
            Expr::Mul(lhs, rhs) => lhs.eval(sample)? * rhs.eval(sample)?,
            Expr::Div(lhs, rhs) => lhs.eval(sample)? / rhs.eval(sample)?,
            Expr::Pow(lhs, rhs) => lhs.eval(sample)?.powf(rhs.eval(sample)?),
            Expr::Log10(arg) => arg.eval(sample)?.log10(),
        };
        Some(value)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Band(name) => write!(f, "{name}"),
            Expr::Const(c) => write!(f, "{c}"),
            Expr::Sub(lhs, rhs) => write!(f, "({lhs}-{rhs})"),
            Expr::Mul(lhs, rhs) => write!(f, "({lhs}*{rhs})"),
            Expr::Div(lhs, rhs) => write!(f, "({lhs}/{rhs})"),
            Expr::Pow(lhs, rhs) => write!(f, "({lhs}**{rhs})"),
            Expr::Log10(arg) => write!(f, "log10({arg})"),
        }
    }
}
