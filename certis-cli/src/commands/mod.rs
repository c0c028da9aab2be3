pub mod fingerprint;
pub mod provision_admin;
pub mod verify;
