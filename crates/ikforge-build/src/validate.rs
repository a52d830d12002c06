//! Pre-build checks.

use ikforge_core::ForgeError;

use crate::partition::JointPartition;

/// Check that `partition` solves exactly `expected_dof` joints.
///
/// Runs before any file is written or any external tool is started.
pub fn validate_dof(partition: &JointPartition, expected_dof: usize) -> Result<(), ForgeError> {
    let got = partition.solve_joints().len();
    if got == expected_dof {
        Ok(())
    } else {
        Err(ForgeError::InvalidConfiguration(format!(
            "Need {expected_dof} solve joints, got: {got}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::partition;

    #[test]
    fn matching_dof_passes() {
        let p = partition(&[0, 1, 2], 3, None).unwrap();
        assert!(validate_dof(&p, 3).is_ok());
    }

    #[test]
    fn mismatched_dof_is_invalid_configuration() {
        let p = partition(&[0, 1, 2], 3, None).unwrap();
        let err = validate_dof(&p, 6).unwrap_err();
        assert!(matches!(err, ForgeError::InvalidConfiguration(_)));
        assert!(err.to_string().contains("Need 6 solve joints, got: 3"));
    }
}
