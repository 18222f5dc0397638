pub mod flutterwave;
pub mod payfast;

pub use flutterwave::{FlutterwaveConfig, FlutterwaveGateway};
pub use payfast::{PayFastConfig, PayFastGateway};
