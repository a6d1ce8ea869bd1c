//! Integration tests for template compilation.

use std::fs;

use serde_yaml::Value;
use tempfile::tempdir;

use evgen_iac::{
    CompileOptions, GenerationPolicy, IacError, MethodSet, SkipReason, TemplateCompiler,
};
use evgen_spec::{ApiSpecification, DocumentFormat, DocumentReader, DocumentWriter};

const CACHE_API: &str = r#"
openapi: 3.0.0
info:
  title: Test API
servers:
  - url: https://api.cache.example.com/
    description: Production
  - url: https://dev.cache.example.com
    description: Development
paths:
  /cache/{cacheName}:
    parameters:
      - $ref: '#/components/parameters/cacheName'
      - $ref: '#/components/parameters/key'
      - $ref: '#/components/parameters/key_base64'
    get:
      operationId: cacheGet
      summary: Get cache item value
      responses:
        '200':
          description: The value of the cache item in raw format
    put:
      parameters:
        - name: ttl_seconds
          in: query
          required: true
          schema:
            type: integer
      operationId: cacheSet
      requestBody:
        required: true
        content:
          application/octet-stream:
            schema:
              type: string
      responses:
        '204':
          $ref: '#/components/responses/NoContent'
    delete:
      operationId: cacheDelete
      responses:
        '204':
          $ref: '#/components/responses/NoContent'
  /topics/{cacheName}/{topicName}:
    parameters:
      - $ref: '#/components/parameters/cacheName'
      - $ref: '#/components/parameters/topicName'
    post:
      operationId: topicPublish
      requestBody:
        required: true
        content:
          application/octet-stream:
            schema:
              type: string
components:
  parameters:
    cacheName:
      name: cacheName
      in: path
      required: true
    key:
      name: key
      in: query
    key_base64:
      name: key_base64
      in: query
    topicName:
      name: topicName
      in: path
"#;

fn cache_api() -> ApiSpecification {
    DocumentReader::parse_spec(CACHE_API).unwrap()
}

fn compile(spec: &ApiSpecification, methods: &str, prefix: &str) -> evgen_iac::Compilation {
    let options = CompileOptions::new()
        .with_methods(MethodSet::parse(methods))
        .with_prefix(prefix);
    TemplateCompiler::new(options).compile(spec).unwrap()
}

fn role_resources(template: &Value) -> Vec<String> {
    template["Resources"]["ApiDestinationsTargetRole"]["Properties"]["Policies"][0]
        ["PolicyDocument"]["Statement"][0]["Resource"]
        .as_sequence()
        .unwrap()
        .iter()
        .map(|r| r["Fn::GetAtt"][0].as_str().unwrap().to_string())
        .collect()
}

/// Test that only accepted methods produce resources.
#[test]
fn test_only_delete_destinations() {
    let result = compile(&cache_api(), "DELETE", "TEST");

    assert!(result.resource("TESTCacheDelete").is_some());
    assert!(result.resource("TESTCacheDeleteRule").is_some());
    for absent in [
        "TESTCachePut",
        "TESTCachePutRule",
        "TESTCacheGet",
        "TESTCacheGetRule",
        "TESTTopicsPost",
        "TESTTopicsPostRule",
    ] {
        assert!(result.resource(absent).is_none(), "unexpected {}", absent);
    }

    assert_eq!(role_resources(&result.template), vec!["TESTCacheDelete"]);
}

/// Test role permissions follow generation order.
#[test]
fn test_get_and_post_destinations() {
    let result = compile(&cache_api(), "GET,POST", "TEST2");

    assert!(result.resource("TEST2CacheGet").is_some());
    assert!(result.resource("TEST2TopicsPost").is_some());
    assert!(result.resource("TEST2CacheDelete").is_none());
    assert!(result.resource("TEST2CachePut").is_none());

    assert_eq!(result.destination_names(), vec!["TEST2CacheGet", "TEST2TopicsPost"]);
    assert_eq!(
        role_resources(&result.template),
        vec!["TEST2CacheGet", "TEST2TopicsPost"]
    );
}

/// Test operations without operationId are skipped without failing the run.
#[test]
fn test_missing_operation_id_is_skipped() {
    let spec = DocumentReader::parse_spec(&CACHE_API.replace("      operationId: topicPublish\n", ""))
        .unwrap();
    let result = compile(&spec, "POST,PUT", "UNIT");

    assert!(result.resource("UNITCachePut").is_some());
    assert!(result.resource("UNITCachePutRule").is_some());
    assert!(result.resource("UNITTopicsPost").is_none());
    assert!(result.resource("UNITTopicsPostRule").is_none());
    assert!(result.resource("UNITCacheDelete").is_none());

    assert_eq!(result.skipped.len(), 1);
    assert_eq!(result.skipped[0].resource_name, "UNITTopicsPost");
    assert_eq!(result.skipped[0].reason, SkipReason::MissingTriggerIdentifier);
    assert_eq!(role_resources(&result.template), vec!["UNITCachePut"]);
}

/// Test query and path parameters on the rule target.
#[test]
fn test_query_parameters_in_rule() {
    let result = compile(&cache_api(), "PUT", "QUERY");

    let rule = result.resource("QUERYCachePutRule").unwrap();
    let targets = rule["Properties"]["Targets"].as_sequence().unwrap();
    assert_eq!(targets.len(), 1);

    let http = &targets[0]["HttpParameters"];
    let query = &http["QueryStringParameters"];
    assert_eq!(query["ttl_seconds"], "$.detail.ttl_seconds");
    assert_eq!(query["key"], "$.detail.key");
    assert_eq!(query["key_base64"], "$.detail.key_base64");
    assert_eq!(query.as_mapping().unwrap().len(), 3);

    let path_values = http["PathParameterValues"].as_sequence().unwrap();
    assert_eq!(path_values.len(), 1);
    assert_eq!(path_values[0], "$.detail.cacheName");

    assert_eq!(targets[0]["InputTransformer"]["InputTemplate"], "\"<message>\"");
    assert_eq!(
        targets[0]["InputTransformer"]["InputPathsMap"]["message"],
        "$.detail.message"
    );
}

/// Test the destination resource shape.
#[test]
fn test_destination_shape() {
    let result = compile(&cache_api(), "POST", "");

    let destination = result.resource("TopicsPost").unwrap();
    assert_eq!(destination["Type"], "AWS::Events::ApiDestination");

    let properties = &destination["Properties"];
    assert_eq!(properties["HttpMethod"], "POST");
    assert_eq!(
        properties["InvocationEndpoint"],
        "https://api.cache.example.com/topics/*/*"
    );
    assert_eq!(properties["InvocationRateLimitPerSecond"], Value::from(300));
    assert_eq!(properties["ConnectionArn"]["Fn::GetAtt"][0], "ApiConnection");

    let rule = result.resource("TopicsPostRule").unwrap();
    assert_eq!(rule["Properties"]["EventPattern"]["detail-type"][0], "topicPublish");
    let target = &rule["Properties"]["Targets"][0];
    assert_eq!(target["Id"], "topicPublish-rule");
    assert_eq!(
        target["HttpParameters"]["PathParameterValues"],
        serde_yaml::from_str::<Value>("['$.detail.cacheName', '$.detail.topicName']").unwrap()
    );
    assert!(target["HttpParameters"].get("QueryStringParameters").is_none());
    assert_eq!(target["DeadLetterConfig"]["Arn"]["Fn::GetAtt"][0], "FailedDeliveryDLQ");
}

/// Test the default template wraps static and generated resources.
#[test]
fn test_default_template() {
    let result = compile(&cache_api(), "DELETE", "");
    let template = &result.template;

    assert_eq!(template["AWSTemplateFormatVersion"], "2010-09-09");
    let names: Vec<_> = result
        .resources()
        .unwrap()
        .keys()
        .filter_map(Value::as_str)
        .collect();
    assert_eq!(
        names,
        vec![
            "ApiDestinationsTargetRole",
            "FailedDeliveryDLQ",
            "ApiConnection",
            "CacheDelete",
            "CacheDeleteRule",
        ]
    );
}

/// Test generated resources are merged over the blueprint.
#[test]
fn test_blueprint_merge() {
    let blueprint = DocumentReader::parse_document(
        r#"
AWSTemplateFormatVersion: '2010-09-09'
Transform: AWS::Serverless-2016-10-31
Parameters:
  MomentoAuthToken:
    Type: String
    NoEcho: true
Resources:
  EventBus:
    Type: AWS::Events::EventBus
  CacheDelete:
    Type: Placeholder
"#,
    )
    .unwrap();

    let options = CompileOptions::new()
        .with_methods(MethodSet::parse("DELETE"))
        .with_blueprint(blueprint);
    let result = TemplateCompiler::new(options).compile(&cache_api()).unwrap();

    assert_eq!(result.template["Transform"], "AWS::Serverless-2016-10-31");
    assert_eq!(result.template["Parameters"]["MomentoAuthToken"]["NoEcho"], true);
    assert_eq!(result.resource("EventBus").unwrap()["Type"], "AWS::Events::EventBus");
    assert_eq!(
        result.resource("CacheDelete").unwrap()["Type"],
        "AWS::Events::ApiDestination"
    );
    assert_eq!(result.replaced_blueprint_resources, vec!["CacheDelete"]);
}

/// Test compiling twice produces byte-identical output.
#[test]
fn test_compilation_is_idempotent() {
    let spec = cache_api();
    let first = compile(&spec, "PUT,POST,DELETE", "Api");
    let second = compile(&spec, "PUT,POST,DELETE", "Api");

    for format in [DocumentFormat::Yaml, DocumentFormat::Json] {
        assert_eq!(
            DocumentWriter::render(&first.template, format).unwrap(),
            DocumentWriter::render(&second.template, format).unwrap()
        );
    }

    let blueprint = first.template.clone();
    let options = CompileOptions::new()
        .with_methods(MethodSet::parse("PUT,POST,DELETE"))
        .with_prefix("Api")
        .with_blueprint(blueprint);
    let regenerated = TemplateCompiler::new(options).compile(&spec).unwrap();
    assert_eq!(regenerated.template, first.template);
}

/// Test role permissions always match the generated destinations.
#[test]
fn test_role_matches_destinations() {
    let spec = cache_api();
    for methods in ["", "GET", "PUT,DELETE", "GET,PUT,POST,DELETE"] {
        let result = compile(&spec, methods, "X");
        let role = role_resources(&result.template);
        assert_eq!(role.len(), result.destinations.len());
        assert_eq!(
            role,
            result.destination_names().into_iter().map(String::from).collect::<Vec<_>>()
        );
    }
}

/// Test base URL selection by environment.
#[test]
fn test_environment_selection() {
    let options = CompileOptions::new()
        .with_methods(MethodSet::parse("DELETE"))
        .with_environment("development");
    let result = TemplateCompiler::new(options).compile(&cache_api()).unwrap();

    assert_eq!(result.base_url, "https://dev.cache.example.com");
    assert_eq!(
        result.resource("CacheDelete").unwrap()["Properties"]["InvocationEndpoint"],
        "https://dev.cache.example.com/cache/*"
    );
}

/// Test fatal base URL errors abort compilation.
#[test]
fn test_base_url_errors() {
    let options = CompileOptions::new().with_environment("staging");
    let err = TemplateCompiler::new(options).compile(&cache_api()).unwrap_err();
    assert!(matches!(err, IacError::EnvironmentNotFound(ref env) if env == "staging"));

    let spec = DocumentReader::parse_spec("paths: {}").unwrap();
    let err = TemplateCompiler::new(CompileOptions::new()).compile(&spec).unwrap_err();
    assert!(matches!(err, IacError::NoServersDefined));
}

/// Test colliding resource names are reported and the later one wins.
#[test]
fn test_name_collisions_are_reported() {
    let spec = DocumentReader::parse_spec(
        r#"
servers:
  - url: https://api.example.com
paths:
  /items/{id}:
    delete:
      operationId: itemDelete
  /items/{name}:
    delete:
      operationId: itemDeleteByName
"#,
    )
    .unwrap();

    let result = compile(&spec, "DELETE", "");

    assert!(result.has_collisions());
    assert_eq!(result.collisions.len(), 2);
    assert_eq!(result.collisions[0].name, "ItemsDelete");
    assert_eq!(result.collisions[0].existing, "DELETE /items/{id}");
    assert_eq!(result.collisions[0].replacement, "DELETE /items/{name}");
    assert_eq!(
        result.resource("ItemsDeleteRule").unwrap()["Properties"]["EventPattern"]["detail-type"][0],
        "itemDeleteByName"
    );
}

/// Test unresolved references are reported but do not fail the run.
#[test]
fn test_unresolved_references() {
    let spec = DocumentReader::parse_spec(
        r#"
servers:
  - url: https://api.example.com
paths:
  /items:
    parameters:
      - $ref: '#/components/parameters/ghost'
    post:
      operationId: itemCreate
      parameters:
        - $ref: '#/components/parameters/limit'
components:
  parameters:
    limit:
      name: limit
      in: query
"#,
    )
    .unwrap();

    let result = compile(&spec, "POST", "");

    assert_eq!(result.unresolved_references.len(), 1);
    assert_eq!(result.unresolved_references[0].reference, "#/components/parameters/ghost");
    assert_eq!(result.unresolved_references[0].method, None);

    let target = &result.resource("ItemsPostRule").unwrap()["Properties"]["Targets"][0];
    assert_eq!(target["HttpParameters"]["QueryStringParameters"]["limit"], "$.detail.limit");
    assert!(target["HttpParameters"].get("PathParameterValues").is_none());
}

/// Test policy overrides flow into the generated resources.
#[test]
fn test_policy_overrides() {
    let dir = tempdir().unwrap();
    let policy_path = dir.path().join("policy.toml");
    fs::write(
        &policy_path,
        "invocation_rate_limit_per_second = 25\ncredential_parameter = \"ServiceToken\"\nrole_name = \"InvokeRole\"\n",
    )
    .unwrap();
    let policy = GenerationPolicy::load(&policy_path).unwrap();

    let options = CompileOptions::new()
        .with_methods(MethodSet::parse("DELETE"))
        .with_policy(policy);
    let result = TemplateCompiler::new(options).compile(&cache_api()).unwrap();

    assert!(result.resource("ApiDestinationsTargetRole").is_none());
    assert!(result.resource("InvokeRole").is_some());
    assert_eq!(
        result.resource("CacheDelete").unwrap()["Properties"]["InvocationRateLimitPerSecond"],
        Value::from(25)
    );
    assert_eq!(
        result.resource("CacheDeleteRule").unwrap()["Properties"]["Targets"][0]["RoleArn"]
            ["Fn::GetAtt"][0],
        "InvokeRole"
    );
    assert_eq!(
        result.resource("ApiConnection").unwrap()["Properties"]["AuthParameters"]
            ["ApiKeyAuthParameters"]["ApiKeyValue"]["Fn::Sub"],
        "${ServiceToken}"
    );
}
