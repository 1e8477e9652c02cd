//! Error taxonomy for the lending engine and reward accumulator.
//!
//! Every fallible entry point in `lendcore-market`, `lendcore-risk` and
//! `lendcore-rewards` returns `Result<T, ProtocolError>`. Nothing is
//! swallowed and no variant is substituted for another: the host is
//! expected to match on `kind()` or the variant itself to decide how to
//! surface a failure to its caller.

use thiserror::Error;

/// The full error taxonomy, grouped the way §7 of the spec groups it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolError {
    // --- input validity ---
    #[error("amount must be greater than zero")]
    ZeroAmount,
    #[error("address must not be the zero address")]
    ZeroAddress,
    #[error("reserve factor must be in [0, WAD]")]
    InvalidReserveFactor,
    #[error("collateral factor must be in [0, WAD)")]
    InvalidCollateralFactor,
    #[error("close factor must be in (0, WAD]")]
    InvalidCloseFactor,
    #[error("liquidation incentive must be >= WAD")]
    InvalidLiquidationIncentive,

    // --- authorisation ---
    #[error("caller is not authorised to perform this action")]
    Unauthorized,
    #[error("a borrower cannot liquidate their own position")]
    SelfLiquidation,

    // --- listing / membership ---
    #[error("market is not listed with the risk manager")]
    NotListed,
    #[error("market is already listed with the risk manager")]
    AlreadyListed,
    #[error("account has already entered this market")]
    AlreadyEntered,

    // --- solvency ---
    #[error("action would leave the account with a collateral shortfall")]
    InsufficientCollateral,
    #[error("market does not hold enough cash to complete this action")]
    InsufficientLiquidity,
    #[error("borrower has no shortfall and may not be liquidated")]
    HealthyBorrower,

    // --- pricing ---
    #[error("oracle has no price for this asset")]
    PriceUnavailable,
    #[error("oracle price is stale")]
    StalePrice,

    // --- lifecycle ---
    #[error("protocol is paused")]
    Paused,
    #[error("reward period has not finished")]
    RewardPeriodNotFinished,
    #[error("reward rate would exceed the funded reward balance")]
    RewardTooHigh,

    // --- arithmetic ---
    #[error("arithmetic overflow")]
    Overflow,
    #[error("division by zero")]
    DivideByZero,

    // --- external ---
    #[error("external token transfer failed")]
    TransferFailed,

    // --- reentrancy ---
    #[error("reentrant call detected")]
    Reentrant,

    // --- configuration ---
    #[error("invalid configuration")]
    ConfigError,
}

/// Coarse-grained classification, mirroring the headings of §7.
///
/// Hosts that want to decide retry/backoff policy or HTTP status codes
/// without matching every variant can dispatch on this instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InputValidity,
    Authorisation,
    Listing,
    Solvency,
    Pricing,
    Lifecycle,
    Arithmetic,
    External,
    Reentrancy,
    Configuration,
}

impl ProtocolError {
    pub fn kind(self) -> ErrorKind {
        use ProtocolError::*;
        match self {
            ZeroAmount | ZeroAddress | InvalidReserveFactor | InvalidCollateralFactor
            | InvalidCloseFactor | InvalidLiquidationIncentive => ErrorKind::InputValidity,
            Unauthorized | SelfLiquidation => ErrorKind::Authorisation,
            NotListed | AlreadyListed | AlreadyEntered => ErrorKind::Listing,
            InsufficientCollateral | InsufficientLiquidity | HealthyBorrower => {
                ErrorKind::Solvency
            }
            PriceUnavailable | StalePrice => ErrorKind::Pricing,
            Paused | RewardPeriodNotFinished | RewardTooHigh => ErrorKind::Lifecycle,
            Overflow | DivideByZero => ErrorKind::Arithmetic,
            TransferFailed => ErrorKind::External,
            Reentrant => ErrorKind::Reentrancy,
            ConfigError => ErrorKind::Configuration,
        }
    }
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
