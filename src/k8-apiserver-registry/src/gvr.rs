//!
//! # Group version resource resolution
//!
//! Resolves the externally addressable group/version/resource of a registered
//! type from the scheme. When a type is registered under several external
//! versions the first one registered wins.
//!
use std::any::TypeId;

use tracing::trace;

use k8_apiserver_types::GroupVersionResource;

use crate::RegistrationError;
use crate::Resource;
use crate::Scheme;

pub fn group_version_resource<T: Resource>(
    scheme: &Scheme,
) -> Result<GroupVersionResource, RegistrationError> {
    resolve(scheme, TypeId::of::<T>(), std::any::type_name::<T>())
}

pub fn resolve(
    scheme: &Scheme,
    type_id: TypeId,
    type_name: &'static str,
) -> Result<GroupVersionResource, RegistrationError> {
    let gvk = scheme
        .object_kinds_by_id(type_id, type_name)?
        .iter()
        .find(|gvk| !gvk.is_internal())
        .ok_or(RegistrationError::NoExternalVersion(type_name))?;

    let gvr = gvk
        .group_version()
        .with_resource(pluralize(&gvk.kind.to_lowercase()));
    trace!(%gvk, %gvr, "resolved resource");
    Ok(gvr)
}

const UNCOUNTABLE: &[&str] = &[
    "equipment",
    "information",
    "rice",
    "money",
    "species",
    "series",
    "fish",
    "sheep",
    "deer",
    "news",
    "metadata",
];

const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("man", "men"),
    ("woman", "women"),
    ("child", "children"),
    ("foot", "feet"),
    ("tooth", "teeth"),
    ("goose", "geese"),
    ("mouse", "mice"),
    ("ox", "oxen"),
    ("quiz", "quizzes"),
    ("index", "indices"),
    ("matrix", "matrices"),
    ("vertex", "vertices"),
    ("datum", "data"),
    ("medium", "media"),
    ("criterion", "criteria"),
    ("octopus", "octopi"),
    ("move", "moves"),
];

const O_ES: &[&str] = &["buffalo", "tomato", "potato", "hero", "echo", "veto"];

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')
}

/// English plural of a lower case noun
pub fn pluralize(singular: &str) -> String {
    if singular.is_empty() || UNCOUNTABLE.contains(&singular) {
        return singular.to_owned();
    }
    if let Some((_, plural)) = IRREGULAR.iter().find(|(s, _)| *s == singular) {
        return (*plural).to_owned();
    }
    if O_ES.contains(&singular) {
        return format!("{}es", singular);
    }

    let stem = |n: usize| &singular[..singular.len() - n];
    let penultimate = singular.chars().rev().nth(1);

    if singular.ends_with("ss")
        || singular.ends_with('x')
        || singular.ends_with('z')
        || singular.ends_with("ch")
        || singular.ends_with("sh")
        || singular.ends_with("us")
    {
        format!("{}es", singular)
    } else if singular.ends_with("is") {
        format!("{}es", stem(2))
    } else if singular.ends_with('y') && !penultimate.map(is_vowel).unwrap_or(false) {
        format!("{}ies", stem(1))
    } else if singular.ends_with("ife") {
        format!("{}ves", stem(2))
    } else if singular.ends_with("lf") || singular.ends_with("rf") || singular.ends_with("eaf") {
        format!("{}ves", stem(1))
    } else if singular.ends_with('s') {
        singular.to_owned()
    } else {
        format!("{}s", singular)
    }
}
