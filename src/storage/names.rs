use super::StoreError;

/// A bare file name: no separators, no NUL, not `.` or `..`.
pub fn validate_name(name: &str) -> Result<&str, StoreError> {
    let invalid = |reason| StoreError::InvalidName {
        name: name.to_string(),
        reason,
    };

    if name.trim().is_empty() {
        return Err(invalid("name must not be empty"));
    }
    if name == "." || name == ".." {
        return Err(invalid("name must not be a directory reference"));
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(invalid("name must not contain path separators"));
    }
    Ok(name)
}

pub fn validate_profile_name(name: &str) -> Result<&str, StoreError> {
    let name = validate_name(name)?;
    if !name.ends_with(".json") || name == ".json" {
        return Err(StoreError::InvalidName {
            name: name.to_string(),
            reason: "profile names must end with .json",
        });
    }
    Ok(name)
}
