//! Every OTTL fragment emitted into a collector configuration is rendered here, so spacing and
//! quoting stay consistent.

pub const K8S_NAMESPACE_NAME: &str = "k8s.namespace.name";

pub fn resource_attribute(key: &str) -> String {
    format!(r#"resource.attributes["{key}"]"#)
}

pub fn resource_attribute_equals(key: &str, value: &str) -> String {
    format!(r#"{} == "{value}""#, resource_attribute(key))
}

pub fn resource_attribute_not_equals(key: &str, value: &str) -> String {
    format!(r#"{} != "{value}""#, resource_attribute(key))
}

pub fn resource_attribute_is_not_nil(key: &str) -> String {
    format!("{} != nil", resource_attribute(key))
}

pub fn attribute_is_nil(key: &str) -> String {
    format!(r#"attributes["{key}"] == nil"#)
}

pub fn name_attribute_equals(name: &str) -> String {
    format!(r#"name == "{name}""#)
}

pub fn instrumentation_scope_name_equals(scope: &str) -> String {
    format!(r#"instrumentation_scope.name == "{scope}""#)
}

pub fn scope_name_equals(scope: &str) -> String {
    format!(r#"scope.name == "{scope}""#)
}

pub fn is_match(key: &str, regex: &str) -> String {
    format!(r#"IsMatch({key}, "{regex}")"#)
}

pub fn has_attr_on_datapoint(key: &str, value: &str) -> String {
    format!(r#"HasAttrOnDatapoint("{key}", "{value}")"#)
}

pub fn namespace_equals(namespace: &str) -> String {
    resource_attribute_equals(K8S_NAMESPACE_NAME, namespace)
}

/// `(a or b ...)`. Empty operands are skipped; a single operand is still wrapped.
pub fn join_with_or<S: AsRef<str>>(operands: &[S]) -> String {
    format!("({})", join(operands, " or "))
}

/// `a and b ...`. Empty operands are skipped.
pub fn join_with_and<S: AsRef<str>>(operands: &[S]) -> String {
    join(operands, " and ")
}

/// `not(x)` with `x` inserted verbatim.
pub fn not(expression: &str) -> String {
    format!("not({expression})")
}

/// `not(a or b ...)`, true when none of the operands holds.
pub fn not_any<S: AsRef<str>>(operands: &[S]) -> String {
    not(&join(operands, " or "))
}

fn join<S: AsRef<str>>(operands: &[S], separator: &str) -> String {
    operands
        .iter()
        .map(AsRef::as_ref)
        .filter(|o| !o.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

/// Condition matching records of any of the namespaces.
pub fn namespaces_match<S: AsRef<str>>(namespaces: &[S]) -> String {
    let operands: Vec<String> = namespaces
        .iter()
        .map(|ns| namespace_equals(ns.as_ref()))
        .collect();
    join_with_or(&operands)
}

/// Drop condition keeping only records from the given namespaces. Records without namespace are
/// kept as well, since they do not come from a workload.
pub fn drop_unless_namespace_in<S: AsRef<str>>(namespaces: &[S]) -> String {
    join_with_and(&[
        resource_attribute_is_not_nil(K8S_NAMESPACE_NAME),
        not(&namespaces_match(namespaces)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(resource_attribute_equals("k", "v"), r#"resource.attributes["k"] == "v""#)]
    #[case(resource_attribute_is_not_nil("k"), r#"resource.attributes["k"] != nil"#)]
    #[case(attribute_is_nil("k"), r#"attributes["k"] == nil"#)]
    #[case(name_attribute_equals("n"), r#"name == "n""#)]
    #[case(instrumentation_scope_name_equals("s"), r#"instrumentation_scope.name == "s""#)]
    #[case(scope_name_equals("s"), r#"scope.name == "s""#)]
    #[case(is_match("name", "^envoy_.*"), r#"IsMatch(name, "^envoy_.*")"#)]
    #[case(has_attr_on_datapoint("k", "v"), r#"HasAttrOnDatapoint("k", "v")"#)]
    #[case(join_with_or(&["a", "b"]), "(a or b)")]
    #[case(join_with_or(&["a"]), "(a)")]
    #[case(join_with_or(&["a", "", "b"]), "(a or b)")]
    #[case(join_with_and(&["a", "b"]), "a and b")]
    #[case(join_with_and(&["", "b"]), "b")]
    #[case(not("a"), "not(a)")]
    #[case(not("(a or b)"), "not((a or b))")]
    #[case(not_any(&["a", "b"]), "not(a or b)")]
    #[case(resource_attribute_not_equals("k", "v"), r#"resource.attributes["k"] != "v""#)]
    fn test_fragments(#[case] got: String, #[case] expected: &str) {
        assert_eq!(got, expected);
    }

    #[test]
    fn test_drop_unless_namespace_in() {
        assert_eq!(
            drop_unless_namespace_in(&["kyma-system", "default"]),
            r#"resource.attributes["k8s.namespace.name"] != nil and not((resource.attributes["k8s.namespace.name"] == "kyma-system" or resource.attributes["k8s.namespace.name"] == "default"))"#
        );
    }
}
