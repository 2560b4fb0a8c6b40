//! Names and labels of derived resources
//!
//! Every derived name embeds the template name, so Userlands bound to
//! different Templates never produce the same Workload or Service name.

use std::collections::BTreeMap;

pub const LABEL_APP: &str = "app";
pub const LABEL_CONTROLLER: &str = "controller";
pub const LABEL_TEMPLATE: &str = "template";

/// Derived resource names for one (template, userland) binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNames {
    template: String,
    userland: String,
    workload: String,
}

impl ResourceNames {
    pub fn new(template: &str, userland: &str) -> Self {
        Self {
            template: template.to_string(),
            userland: userland.to_string(),
            workload: format!("{}-{}", template, userland),
        }
    }

    /// `<template>-<userland>`
    pub fn workload(&self) -> &str {
        &self.workload
    }

    /// `<template>-<userland>-svc`
    pub fn service(&self) -> String {
        format!("{}-svc", self.workload)
    }

    /// `<template>-<userland>-pvc-<volume>`
    pub fn claim(&self, volume: &str) -> String {
        format!("{}-pvc-{}", self.workload, volume)
    }

    /// Labels used for the workload selector, pod labels and service selector
    pub fn labels(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (LABEL_APP.to_string(), self.workload.clone()),
            (LABEL_CONTROLLER.to_string(), self.userland.clone()),
            (LABEL_TEMPLATE.to_string(), self.template.clone()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_names() {
        let names = ResourceNames::new("t1", "u1");
        assert_eq!(names.workload(), "t1-u1");
        assert_eq!(names.service(), "t1-u1-svc");
        assert_eq!(names.claim("data"), "t1-u1-pvc-data");
    }

    #[test]
    fn test_labels() {
        let labels = ResourceNames::new("t1", "u1").labels();
        assert_eq!(labels["app"], "t1-u1");
        assert_eq!(labels["controller"], "u1");
        assert_eq!(labels["template"], "t1");
    }
}
