//! Input validation for API requests.
//!
//! Field-level checks shared across handlers. For collecting several errors
//! into one response use `ValidationErrorBuilder` from the `error` module.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Reasonable email shape; deliverability is proven by the confirmation
    /// mail, not the regex
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$"
    ).unwrap();

    /// Size labels: S, M, L, XL, XXL and numeric kids sizes
    static ref SIZE_REGEX: Regex = Regex::new(
        r"^[A-Z0-9]{1,4}$"
    ).unwrap();

    /// Phone numbers: optional +, 7-15 digits
    static ref PHONE_REGEX: Regex = Regex::new(
        r"^\+?[0-9]{7,15}$"
    ).unwrap();

    /// Indian postal codes: exactly 6 digits, not starting with 0
    static ref PINCODE_REGEX: Regex = Regex::new(
        r"^[1-9][0-9]{5}$"
    ).unwrap();

    static ref UUID_REGEX: Regex = Regex::new(
        r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$"
    ).unwrap();
}

/// Validate a UUID path or body parameter
pub fn validate_uuid(value: &str, field: &str) -> Result<(), String> {
    if UUID_REGEX.is_match(value) {
        Ok(())
    } else {
        Err(format!("{} must be a valid UUID", field))
    }
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }
    if email.len() > 254 {
        return Err("Email is too long".to_string());
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email address".to_string());
    }
    Ok(())
}

pub fn validate_size(size: &str) -> Result<(), String> {
    if !SIZE_REGEX.is_match(size) {
        return Err(format!(
            "Invalid size '{}'. Use labels like S, M, L, XL, XXL",
            size
        ));
    }
    Ok(())
}

pub fn validate_phone(phone: &str) -> Result<(), String> {
    if phone.is_empty() {
        return Err("Phone number is required".to_string());
    }
    if !PHONE_REGEX.is_match(phone) {
        return Err("Invalid phone number".to_string());
    }
    Ok(())
}

pub fn validate_pincode(pincode: &str) -> Result<(), String> {
    if pincode.is_empty() {
        return Err("Pincode is required".to_string());
    }
    if !PINCODE_REGEX.is_match(pincode) {
        return Err("Pincode must be a 6-digit postal code".to_string());
    }
    Ok(())
}

/// Validate a jersey title
pub fn validate_title(title: &str) -> Result<(), String> {
    if title.trim().is_empty() {
        return Err("Title is required".to_string());
    }
    if title.len() < 3 {
        return Err("Title is too short (min 3 characters)".to_string());
    }
    if title.len() > 150 {
        return Err("Title is too long (max 150 characters)".to_string());
    }
    Ok(())
}

/// Validate a short free-text field such as club or quality
pub fn validate_label(value: &str, field: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} is required", field));
    }
    if value.len() > 100 {
        return Err(format!("{} is too long (max 100 characters)", field));
    }
    Ok(())
}

/// Prices are whole rupees
pub fn validate_price(price: i64) -> Result<(), String> {
    if price <= 0 {
        return Err("Price must be greater than zero".to_string());
    }
    if price > 1_000_000 {
        return Err("Price is unreasonably large".to_string());
    }
    Ok(())
}

pub fn validate_quantity(quantity: i64) -> Result<(), String> {
    if quantity < 1 {
        return Err("Quantity must be at least 1".to_string());
    }
    if quantity > 100 {
        return Err("Quantity is too large (max 100 per item)".to_string());
    }
    Ok(())
}

pub fn validate_stock(stock: i64) -> Result<(), String> {
    if stock < 0 {
        return Err("Stock cannot be negative".to_string());
    }
    if stock > 100_000 {
        return Err("Stock is unreasonably large".to_string());
    }
    Ok(())
}

/// Validate a required free-text field (shipping address lines, store names)
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} is required", field));
    }
    if value.len() > max_len {
        return Err(format!("{} is too long (max {} characters)", field, max_len));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("buyer@example.com").is_ok());
        assert!(validate_email("name.tag+x@shop.co.in").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("a@b").is_err());
    }

    #[test]
    fn test_validate_size() {
        for size in ["S", "M", "L", "XL", "XXL", "38", "40"] {
            assert!(validate_size(size).is_ok(), "size {} should pass", size);
        }
        assert!(validate_size("").is_err());
        assert!(validate_size("extra-large").is_err());
        assert!(validate_size("xl").is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("+919876543210").is_ok());
        assert!(validate_phone("9876543210").is_ok());
        assert!(validate_phone("12345").is_err());
        assert!(validate_phone("98-76-54").is_err());
    }

    #[test]
    fn test_validate_pincode() {
        assert!(validate_pincode("560001").is_ok());
        assert!(validate_pincode("060001").is_err());
        assert!(validate_pincode("5600").is_err());
        assert!(validate_pincode("").is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("0191a8b4-6bb1-7f8e-9d6a-111122223333", "id").is_ok());
        assert!(validate_uuid("not-a-uuid", "id").is_err());
    }

    #[test]
    fn test_validate_price_and_quantity() {
        assert!(validate_price(500).is_ok());
        assert!(validate_price(0).is_err());
        assert!(validate_price(-5).is_err());
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(1000).is_err());
    }
}
