//! Admission validation
//!
//! Pure classifiers consulted by the session message handlers: one for the
//! charger identity announced at boot, one for id tokens presented during
//! authorization. Both are built once from the configured allow-lists and
//! never fail at validation time.

mod charger;
mod token;

pub use charger::{ChargerIdentityValidator, ValidatorError};
pub use token::TokenValidator;
