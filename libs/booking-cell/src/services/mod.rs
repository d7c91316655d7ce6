pub mod availability;
pub mod ledger;
pub mod notifier;
pub mod sweeper;
