//! Payload checks applied before a request reaches the lifecycle.

use std::sync::LazyLock;

use regex::Regex;

static ROLE_ARN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"arn:aws:iam::\d{12}:role/?[a-zA-Z_0-9+=,.@\-_/]+").unwrap()
});

pub const INVALID_ROLE_ARN: &str = "codeBuildRoleARN is not a valid IAM Role ARN";

/// Whether `arn` names an IAM role the build system can assume.
pub fn is_valid_role_arn(arn: &str) -> bool {
    ROLE_ARN_REGEX.is_match(arn)
}
