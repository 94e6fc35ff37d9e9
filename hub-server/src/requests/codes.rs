//! Verification code generation
//!
//! Codes are generated server-side only. The QR token is a 128-bit
//! random value, unguessable; the delivery OTP is deliberately short
//! because it is only valid for one request in Ready state and is
//! delivered to the student out of band.

use rand::Rng;

/// Generate a QR pickup token (32 hex chars)
pub fn generate_qr_token() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill(&mut bytes);
    hex::encode(bytes)
}

/// Generate a 4-digit delivery OTP, zero-padded ("0000".."9999")
pub fn generate_otp() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..10_000);
    format!("{n:04}")
}
