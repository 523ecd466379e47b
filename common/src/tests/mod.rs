mod error_location;
mod pairing_code;
