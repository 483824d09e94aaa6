use crate::band_math::Expr;
use crate::error::BotError;
use crate::scene::BandPair;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What the catalog assets store per pixel.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InputUnits {
    /// Backscatter already in dB.
    Decibels,
    /// GRD digital numbers, i.e. uncalibrated amplitude.
    Amplitude,
}

pub fn db_to_linear(x: f64) -> f64 {
    10f64.powf(x / 10.0)
}

pub fn linear_to_db(x: f64) -> f64 {
    10.0 * x.log10()
}

/// `10*log10(dn^2) - calibration_db`: amplitude to dB with a constant calibration gain.
pub fn amplitude_to_db(dn: f64, calibration_db: f64) -> f64 {
    10.0 * (dn * dn).log10() - calibration_db
}

pub fn amplitude_to_db_expr(expr: &Expr, calibration_db: f64) -> Expr {
    Expr::Const(10.0)
        .mul(expr.clone().pow(Expr::Const(2.0)).log10())
        .sub(Expr::Const(calibration_db))
}

/// `10^(expr/10)` as a band-math expression.
pub fn db_to_linear_expr(expr: &Expr) -> Expr {
    Expr::Const(10.0).pow(expr.clone().div(Expr::Const(10.0)))
}

/// A multi-band radar image, each band an expression over catalog assets.
#[derive(Debug, Clone, PartialEq)]
pub struct SarImage {
    bands: BTreeMap<String, Expr>,
}

impl SarImage {
    /// Bands keyed by id, each reading the asset named after the lowercased id.
    pub fn from_bands(ids: &[String]) -> Self {
        let bands = ids
            .iter()
            .map(|id| (id.to_owned(), Expr::band(&id.to_lowercase())))
            .collect();
        Self { bands }
    }

    pub fn band(&self, id: &str) -> Option<&Expr> {
        self.bands.get(id)
    }

    /// Express every band in dB. Decibel inputs pass through unchanged.
    pub fn to_decibels(&self, units: InputUnits, calibration_db: f64) -> Self {
        match units {
            InputUnits::Decibels => self.clone(),
            InputUnits::Amplitude => {
                let bands = self
                    .bands
                    .iter()
                    .map(|(id, expr)| (id.to_owned(), amplitude_to_db_expr(expr, calibration_db)))
                    .collect();
                Self { bands }
            }
        }
    }

    /// Decibel to linear power on every band.
    pub fn to_linear(&self) -> Self {
        let bands = self
            .bands
            .iter()
            .map(|(id, expr)| (id.to_owned(), db_to_linear_expr(expr)))
            .collect();
        Self { bands }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Composite {
    pub red: Expr,
    pub green: Expr,
    pub blue: Expr,
}

impl Composite {
    pub fn channel(&self, name: &str) -> Result<&Expr> {
        match name {
            "red" => Ok(&self.red),
            "green" => Ok(&self.green),
            "blue" => Ok(&self.blue),
            _ => Err(BotError::UnknownChannel(name.to_string()).into()),
        }
    }

    /// Channel expressions in the given order, `;`-separated.
    pub fn expression(&self, order: &[String]) -> Result<String> {
        let channels = order
            .iter()
            .map(|name| self.channel(name).map(Expr::to_string))
            .collect::<Result<Vec<_>>>()?;
        Ok(channels.join(";"))
    }
}

/// red = co-pol, green = 2 * cross-pol, blue = co-pol / cross-pol / 100. Values are not clamped.
pub fn pseudocolor(image: &SarImage, bands: &BandPair) -> Result<Composite> {
    let copol = image
        .band(&bands.copol)
        .ok_or(anyhow!("Image has no band {}", bands.copol))?;
    let crosspol = image
        .band(&bands.crosspol)
        .ok_or(anyhow!("Image has no band {}", bands.crosspol))?;

    Ok(Composite {
        red: copol.clone(),
        green: Expr::Const(2.0).mul(crosspol.clone()),
        blue: copol
            .clone()
            .div(crosspol.clone())
            .div(Expr::Const(100.0)),
    })
}
