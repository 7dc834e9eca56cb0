use alloy::primitives::U256;
use fastnum::{
    UD256, bint,
    decimal::{Context, RoundingMode, UnsignedDecimal},
};

/// Minor units to decimal converter for payment token amounts.
#[derive(Clone, Copy, Debug, Default)]
pub struct Converter {
    decimals: i32,
}

impl Converter {
    pub fn new(decimals: u8) -> Self {
        Self {
            decimals: decimals as i32,
        }
    }

    pub fn from_unsigned<const N: usize>(&self, value: U256) -> UnsignedDecimal<N> {
        let unscaled = bint::UInt::<N>::from_le_slice(value.as_le_slice())
            .expect("Converter: U256 -> UInt::<N>");
        UnsignedDecimal::<N>::from_parts(
            unscaled,
            -self.decimals,
            Context::default().with_rounding_mode(RoundingMode::Floor),
        )
    }

    /// Exact token amount, lossy only at the final float step.
    pub fn to_f64(&self, value: U256) -> f64 {
        let exact: UD256 = self.from_unsigned(value);
        exact.to_string().parse().unwrap_or(f64::NAN)
    }
}

/// Token amount as shown to people: shortest float representation,
/// so `1.5` rather than `1.500000000000000000`.
pub fn display_amount(amount: f64) -> String {
    format!("{amount}")
}

/// USD amount rounded to cents at display time only.
pub fn display_usd(amount: f64) -> String {
    format!("{amount:.2}")
}
