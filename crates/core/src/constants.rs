/// Decimal precision for valuation calculations
pub const DECIMAL_PRECISION: u32 = 6;

/// Decimal precision for display
pub const DISPLAY_DECIMAL_PRECISION: u32 = 2;

/// Quantity threshold for significant positions
pub const QUANTITY_THRESHOLD: &str = "0.00000001";

/// Day-count basis used to annualize money-weighted returns
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Base currency used when no settings are supplied
pub const DEFAULT_BASE_CURRENCY: &str = "USD";

/// Origin-type codes of transfers that only move cash inside the portfolio (FX conversions, journals)
pub const DEFAULT_INTERNAL_TRANSFER_CODES: [&str; 2] = ["FXT", "JRN"];

/// Convergence tolerance of the XIRR root finder (on both the rate step and the NPV)
pub const XIRR_TOLERANCE: f64 = 1e-9;

/// Iteration cap of the XIRR root finder, per phase (Newton, then bisection)
pub const XIRR_MAX_ITERATIONS: u32 = 100;

/// Starting guess of the Newton phase (10%)
pub const XIRR_INITIAL_GUESS: f64 = 0.1;

/// Lower bound of the bisection bracket; a rate of -100% would discount to infinity
pub const XIRR_MIN_RATE: f64 = -0.999_999;

/// Upper bound the bisection bracket may grow to before giving up
pub const XIRR_MAX_RATE: f64 = 1.0e6;
