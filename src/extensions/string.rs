pub trait ToPhoneDigits {
    /// Returns only the ASCII digits, so `+1 (555) 010-2000` and
    /// `15550102000` compare equal.
    fn to_phone_digits(&self) -> String;
}

impl ToPhoneDigits for str {
    fn to_phone_digits(&self) -> String {
        self.chars().filter(|c| c.is_ascii_digit()).collect()
    }
}

impl ToPhoneDigits for String {
    fn to_phone_digits(&self) -> String {
        self.as_str().to_phone_digits()
    }
}

pub trait SplitSlugs {
    /// Splits a comma-separated slug list, trimming and lowercasing entries
    /// and dropping empty ones.
    fn split_slugs(&self) -> Vec<String>;
}

impl SplitSlugs for str {
    fn split_slugs(&self) -> Vec<String> {
        self.split(',')
            .map(|s| s.trim().to_ascii_lowercase())
            .filter(|s| !s.is_empty())
            .collect()
    }
}
