//! Wheel compatibility tags and the target environment they are checked against.

use std::fmt;

/// A single `{interpreter}-{abi}-{platform}` compatibility tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag {
    pub interpreter: String,
    pub abi: String,
    pub platform: String,
}

impl Tag {
    pub fn new(
        interpreter: impl Into<String>,
        abi: impl Into<String>,
        platform: impl Into<String>,
    ) -> Self {
        Tag {
            interpreter: interpreter.into(),
            abi: abi.into(),
            platform: platform.into(),
        }
    }

    /// Expand compressed tag fields (`py2.py3`) into the cartesian product.
    pub fn expand(interpreters: &str, abis: &str, platforms: &str) -> Vec<Tag> {
        let mut tags = Vec::new();
        for interpreter in interpreters.split('.') {
            for abi in abis.split('.') {
                for platform in platforms.split('.') {
                    tags.push(Tag::new(interpreter, abi, platform));
                }
            }
        }
        tags
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.interpreter, self.abi, self.platform)
    }
}

/// The interpreter and platform a wheel will be installed into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetEnvironment {
    /// Interpreter tag such as `cp311`.
    pub interpreter_tag: String,
    /// `(major, minor)` of the interpreter.
    pub python_version: (u32, u32),
    /// Supported platform tags, most specific first. Always contains `any`.
    pub platform_tags: Vec<String>,
}

impl TargetEnvironment {
    pub fn new(
        interpreter_tag: impl Into<String>,
        python_version: (u32, u32),
        mut platform_tags: Vec<String>,
    ) -> Self {
        if !platform_tags.iter().any(|p| p == "any") {
            platform_tags.push("any".to_string());
        }
        TargetEnvironment {
            interpreter_tag: interpreter_tag.into(),
            python_version,
            platform_tags,
        }
    }

    fn supports_platform(&self, platform: &str) -> bool {
        self.platform_tags.iter().any(|p| p == platform)
    }

    /// Check whether a wheel tag can be installed into this environment.
    pub fn is_compatible(&self, tag: &Tag) -> bool {
        let this = self.interpreter_tag.as_str();

        match tag.abi.as_str() {
            "none" => {
                if tag.interpreter != "py3" && tag.interpreter != this {
                    tracing::debug!(
                        "Skipping tag {} because of incompatible interpreter tag for ABI generic wheel",
                        tag
                    );
                    return false;
                }
            }
            "abi3" => {
                // The stable ABI accepts any CPython 3 interpreter not newer than ours.
                let minor = tag
                    .interpreter
                    .strip_prefix("cp3")
                    .and_then(|m| m.parse::<u32>().ok());
                match minor {
                    Some(minor) if minor <= self.python_version.1 => {}
                    Some(_) => {
                        tracing::debug!("Skipping tag {} because abi3 interpreter tag is too new", tag);
                        return false;
                    }
                    None => {
                        tracing::debug!("Skipping tag {} because abi3 interpreter tag is incorrect", tag);
                        return false;
                    }
                }
            }
            abi if abi == this => {
                if tag.interpreter != this {
                    tracing::debug!(
                        "Skipping tag {} because of incompatible interpreter tag for Python ABI",
                        tag
                    );
                    return false;
                }
            }
            _ => {
                tracing::debug!(
                    "Skipping tag {} because ABI tag does not match the interpreter tag",
                    tag
                );
                return false;
            }
        }

        if self.supports_platform(&tag.platform) {
            return true;
        }
        tracing::debug!("Skipping tag {} because the platform tag is incompatible", tag);
        false
    }

    /// True if any of the tags is compatible.
    pub fn accepts_any(&self, tags: &[Tag]) -> bool {
        tags.iter().any(|tag| {
            tracing::info!("Testing tag {} against {}", tag, self.interpreter_tag);
            self.is_compatible(tag)
        })
    }
}
