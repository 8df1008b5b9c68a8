pub mod angelone;
pub mod bankbazaar;
pub mod goodreturns;

pub use angelone::AngelOne;
pub use bankbazaar::BankBazaar;
pub use goodreturns::GoodReturns;
