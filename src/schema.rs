//! Package specification consumed by client-library generators

use crate::provider::image::{
    ARGS, CONTEXT, CONTEXT_DIGEST, DEFAULT_CONTEXT, DEFAULT_DOCKERFILE, DOCKERFILE, NAME,
    PLATFORMS, REGISTRY, REGISTRY_SERVER, REPO_DIGEST, RESOURCE_TYPE, TARGET,
};
use serde_json::{Value, json};

pub const PACKAGE_NAME: &str = "docker-buildkit";

const REGISTRY_TYPE: &str = "docker-buildkit:index:Registry";
const BUILD_ARG_TYPE: &str = "docker-buildkit:index:BuildArg";

fn string(description: &str) -> Value {
    json!({ "type": "string", "description": description })
}

fn string_array(description: &str) -> Value {
    json!({
        "type": "array",
        "items": { "type": "string" },
        "description": description,
    })
}

fn type_ref(token: &str) -> String {
    format!("#/types/{token}")
}

/// Input properties of the image resource
fn input_properties() -> Value {
    json!({
        DOCKERFILE: {
            "type": "string",
            "description": "The path to the Dockerfile to use, relative to the context.",
            "default": DEFAULT_DOCKERFILE,
        },
        CONTEXT: {
            "type": "string",
            "description": "The path to the build context to use.",
            "default": DEFAULT_CONTEXT,
        },
        NAME: string("The name of the image."),
        REGISTRY: {
            "$ref": type_ref(REGISTRY_TYPE),
            "description": "The registry to push the image to.",
        },
        PLATFORMS: string_array("The platforms to build for."),
        TARGET: string("The build stage to target in a multi-stage Dockerfile."),
        ARGS: {
            "type": "array",
            "items": { "$ref": type_ref(BUILD_ARG_TYPE) },
            "description": "Build-time variables passed as --build-arg.",
        },
    })
}

/// Output properties: the inputs minus `registry`, plus derived values
fn output_properties() -> Value {
    let mut properties = input_properties();
    if let Some(map) = properties.as_object_mut() {
        map.remove(REGISTRY);
        for property in map.values_mut() {
            if let Some(property) = property.as_object_mut() {
                property.remove("default");
            }
        }
        map.insert(
            CONTEXT_DIGEST.to_string(),
            string("The digest of the build context."),
        );
        map.insert(
            REPO_DIGEST.to_string(),
            string("The digest of the image manifest in the registry."),
        );
        map.insert(
            REGISTRY_SERVER.to_string(),
            string("The URL of the registry server hosting the image."),
        );
    }
    properties
}

/// Full package specification for `version`
pub fn package_spec(version: &str) -> Value {
    json!({
        "name": PACKAGE_NAME,
        "version": version,
        "description": "A package for building Docker images with Buildkit.",
        "license": "Apache-2.0",
        "provider": {},
        "resources": {
            RESOURCE_TYPE: {
                "description": "Builds a Docker image using Buildkit and pushes it to a registry.",
                "properties": output_properties(),
                "required": [
                    DOCKERFILE, CONTEXT, NAME, PLATFORMS,
                    CONTEXT_DIGEST, REPO_DIGEST, REGISTRY_SERVER,
                ],
                "inputProperties": input_properties(),
                "requiredInputs": [NAME, REGISTRY],
            },
        },
        "types": {
            REGISTRY_TYPE: {
                "type": "object",
                "description": "Describes a Docker container registry.",
                "properties": {
                    "server": string("The URL of the Docker registry server."),
                    "username": string("The username to authenticate with."),
                    "password": {
                        "type": "string",
                        "description": "The password to authenticate with.",
                        "secret": true,
                    },
                },
                "required": ["server"],
            },
            BUILD_ARG_TYPE: {
                "type": "object",
                "description": "A build-time variable.",
                "properties": {
                    "key": string("The name of the build argument."),
                    "value": string("The value of the build argument."),
                },
                "required": ["key", "value"],
            },
        },
        "language": {
            "python": {},
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_and_types() {
        let spec = package_spec("1.2.3");
        assert_eq!(spec["name"], "docker-buildkit");
        assert_eq!(spec["version"], "1.2.3");

        let resource = &spec["resources"][RESOURCE_TYPE];
        assert_eq!(resource["requiredInputs"], json!(["name", "registry"]));
        assert_eq!(
            resource["inputProperties"]["registry"]["$ref"],
            "#/types/docker-buildkit:index:Registry"
        );
        assert_eq!(
            resource["inputProperties"]["args"]["items"]["$ref"],
            "#/types/docker-buildkit:index:BuildArg"
        );
        assert_eq!(resource["inputProperties"]["dockerfile"]["default"], "Dockerfile");
        assert_eq!(resource["inputProperties"]["context"]["default"], ".");

        assert_eq!(spec["types"][REGISTRY_TYPE]["required"], json!(["server"]));
        assert!(spec["types"][BUILD_ARG_TYPE]["properties"]["key"].is_object());
    }

    #[test]
    fn test_outputs_never_expose_registry() {
        let spec = package_spec("0.1.0");
        let outputs = spec["resources"][RESOURCE_TYPE]["properties"]
            .as_object()
            .unwrap();

        assert!(!outputs.contains_key("registry"));
        for key in ["contextDigest", "repoDigest", "registryServer", "target", "args"] {
            assert!(outputs.contains_key(key), "missing output {key}");
        }
        assert!(outputs["dockerfile"].get("default").is_none());
    }

    #[test]
    fn test_every_required_output_is_declared() {
        let spec = package_spec("0.1.0");
        let resource = &spec["resources"][RESOURCE_TYPE];
        for key in resource["required"].as_array().unwrap() {
            let key = key.as_str().unwrap();
            assert!(resource["properties"].get(key).is_some(), "undeclared {key}");
        }
    }
}
