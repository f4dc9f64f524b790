use regex::Regex;

pub fn validate_email(email: &str) -> bool {
    validator::validate_email(email)
}

pub fn validate_phone(phone: &str) -> bool {
    let re = Regex::new(r"^\d{10}$").unwrap();
    re.is_match(phone)
}

pub fn validate_password(password: &str) -> bool {
    (8..=15).contains(&password.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_email() {
        assert!(validate_email("jane@example.com"));
        assert!(!validate_email("not-an-email"));
        assert!(!validate_email(""));
    }

    #[test]
    fn phone_must_be_ten_digits() {
        assert!(validate_phone("5551234567"));
        assert!(!validate_phone("555123"));
        assert!(!validate_phone("555123456a"));
        assert!(!validate_phone("+15551234567"));
    }

    #[test]
    fn password_length_window() {
        assert!(!validate_password("short"));
        assert!(validate_password("eightchr"));
        assert!(validate_password("fifteen-chars15"));
        assert!(!validate_password("sixteen-chars-16"));
    }
}
