use serde::{Deserialize, Serialize};

/// Latitude limit of the Web Mercator projection, in degrees.
pub const MERCATOR_MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Per-axis mapping between a plot's data values and shared plot coordinates.
///
/// Most plots draw data directly in plot space. Geographic layers draw
/// latitude through a Mercator projection so that they line up with map tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DataTransform {
    #[default]
    Identity,
    Mercator,
}

impl DataTransform {
    #[must_use]
    pub fn data_to_plot(self, value: f64) -> f64 {
        match self {
            Self::Identity => value,
            Self::Mercator => {
                let latitude = value.clamp(-MERCATOR_MAX_LATITUDE, MERCATOR_MAX_LATITUDE);
                let phi = latitude.to_radians();
                (std::f64::consts::FRAC_PI_4 + phi / 2.0).tan().ln().to_degrees()
            }
        }
    }

    #[must_use]
    pub fn plot_to_data(self, value: f64) -> f64 {
        match self {
            Self::Identity => value,
            Self::Mercator => {
                let y = value.to_radians();
                (2.0 * y.exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees()
            }
        }
    }
}
