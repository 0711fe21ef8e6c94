pub mod pipeline;
pub mod repository;

use rand::Rng;

const ADDRESS_LOCAL_PART_LEN: usize = 16;

/// Generates a random intake address under the configured domain, e.g.
/// `k3j9x2m8q1w5e7r4@intake.example.com`. The address is the sole routing
/// key for inbound mail, so it must be unguessable.
pub fn generate_email_address(domain: &str) -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    let local_part: String = (0..ADDRESS_LOCAL_PART_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("{local_part}@{domain}")
}

#[cfg(test)]
mod tests {
    use super::generate_email_address;

    #[test]
    fn addresses_use_the_configured_domain() {
        let address = generate_email_address("intake.example.com");
        let (local, domain) = address.split_once('@').unwrap();
        assert_eq!(domain, "intake.example.com");
        assert_eq!(local.len(), 16);
        assert!(local.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn addresses_are_random() {
        assert_ne!(
            generate_email_address("intake.example.com"),
            generate_email_address("intake.example.com")
        );
    }
}
