use rand::distributions::Alphanumeric;
use rand::Rng;

use k8_apiserver_types::FieldError;
use k8_apiserver_types::FieldErrorList;
use k8_apiserver_types::FieldPath;
use k8_apiserver_types::ObjectMeta;

const MAX_NAME_LENGTH: usize = 63;
const MAX_SUBDOMAIN_LENGTH: usize = 253;
const RANDOM_LENGTH: usize = 5;
const MAX_GENERATED_NAME_LENGTH: usize = MAX_NAME_LENGTH - RANDOM_LENGTH;

/// name derived from `generateName` with a random lower case suffix
pub fn generate_name(base: &str) -> String {
    let base = if base.len() > MAX_GENERATED_NAME_LENGTH {
        let mut end = MAX_GENERATED_NAME_LENGTH;
        while !base.is_char_boundary(end) {
            end -= 1;
        }
        &base[..end]
    } else {
        base
    };

    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .map(char::from)
        .filter(|c| !c.is_ascii_uppercase())
        .take(RANDOM_LENGTH)
        .collect();

    format!("{}{}", base, suffix)
}

fn is_alphanumeric(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit()
}

/// lower case alphanumerics and '-', starting and ending alphanumeric, at most 63 chars
pub fn is_dns1123_label(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_NAME_LENGTH
        && value.starts_with(is_alphanumeric)
        && value.ends_with(is_alphanumeric)
        && value.chars().all(|c| is_alphanumeric(c) || c == '-')
}

/// dot separated DNS-1123 labels, at most 253 chars
pub fn is_dns1123_subdomain(value: &str) -> bool {
    value.len() <= MAX_SUBDOMAIN_LENGTH && value.split('.').all(is_dns1123_label)
}

/// name usable as a single key segment: non empty, no '/' or '%', not `.` or `..`
pub fn is_path_segment(value: &str) -> bool {
    !value.is_empty() && value != "." && value != ".." && !value.contains(['/', '%'])
}

/// name must be a DNS-1123 subdomain, namespace a DNS-1123 label
pub fn validate_object_name(meta: &ObjectMeta, namespaced: bool) -> FieldErrorList {
    let mut errors = FieldErrorList::new();
    let path = FieldPath::new("metadata");
    if !is_dns1123_subdomain(&meta.name) {
        errors.push(FieldError::invalid(
            &path.child("name"),
            &meta.name,
            "a lowercase RFC 1123 subdomain must consist of lower case alphanumeric characters, '-' or '.', and must start and end with an alphanumeric character",
        ));
    }
    if namespaced && !is_dns1123_label(&meta.namespace) {
        errors.push(FieldError::invalid(
            &path.child("namespace"),
            &meta.namespace,
            "a lowercase RFC 1123 label must consist of lower case alphanumeric characters or '-', and must start and end with an alphanumeric character",
        ));
    }
    errors
}
