use k8_apiserver_types::FieldError;
use k8_apiserver_types::FieldErrorList;
use k8_apiserver_types::FieldPath;

use crate::v1alpha1::Fischer;
use crate::v1alpha1::Flunder;
use crate::v1alpha1::FlunderSpec;
use crate::v1alpha1::FISCHER_REFERENCE_TYPE;
use crate::v1alpha1::FLUNDER_REFERENCE_TYPE;

pub fn validate_flunder(flunder: &Flunder) -> FieldErrorList {
    validate_flunder_spec(&flunder.spec, &FieldPath::new("spec"))
}

pub fn validate_flunder_spec(spec: &FlunderSpec, path: &FieldPath) -> FieldErrorList {
    let mut errors = FieldErrorList::new();

    if spec.reference.is_empty() {
        errors.push(FieldError::invalid(
            &path.child("reference"),
            &spec.reference,
            "cannot be empty",
        ));
    }

    if let Some(reference_type) = spec.reference_type.as_deref() {
        if !reference_type.is_empty()
            && reference_type != FLUNDER_REFERENCE_TYPE
            && reference_type != FISCHER_REFERENCE_TYPE
        {
            errors.push(FieldError::invalid(
                &path.child("referenceType"),
                reference_type,
                "must be Flunder or Fischer",
            ));
        }
    }

    errors
}

/// every disallowed flunder must be named
pub fn validate_fischer(fischer: &Fischer) -> FieldErrorList {
    let path = FieldPath::new("disallowedFlunders");
    fischer
        .disallowed_flunders
        .iter()
        .enumerate()
        .filter(|(_, name)| name.trim().is_empty())
        .map(|(i, _)| FieldError::required(&path.index(i), "flunder name must not be empty"))
        .collect()
}
