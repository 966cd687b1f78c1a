//! Acceptance tests for the composition layer: extension, self-reference,
//! sibling references, and dependency injection.

use crate::error::{BuildError, CallError, DefineError};
use crate::typed::{
    implementation, refer_to, refer_to_self, Callable, DependencyBindings, Implementation,
    SelfHandle, TypedFunction, TypedFunctionBuilder,
};
use crate::TypedEnvironment;
use indexmap::IndexMap;
use numera_values::Value;
use std::sync::Arc;

fn sigs(entries: Vec<(&str, Callable)>) -> IndexMap<String, Callable> {
    entries
        .into_iter()
        .map(|(source, callable)| (source.to_string(), callable))
        .collect()
}

fn tag(label: &'static str) -> Callable {
    implementation(move |_: &[Value]| Ok(Value::Str(label.to_string())))
}

#[test]
fn test_extend_adds_signatures_without_disturbing_base() {
    let env = TypedEnvironment::standard();
    let base = env
        .define_typed("size", sigs(vec![("number", tag("scalar"))]))
        .unwrap();

    let extended = TypedFunction::extend(
        &base,
        &env,
        sigs(vec![("Array", tag("collection"))]),
    )
    .unwrap();

    assert_eq!(
        extended.call(&[Value::Number(1.0)]).unwrap(),
        Value::Str("scalar".to_string())
    );
    assert_eq!(
        extended.call(&[Value::Array(vec![])]).unwrap(),
        Value::Str("collection".to_string())
    );
    // The base neither gained the new signature nor changed identity.
    assert!(matches!(
        base.call(&[Value::Array(vec![])]),
        Err(CallError::NoMatch { .. })
    ));
    assert!(Arc::ptr_eq(&extended.base().unwrap(), &base));
}

#[test]
fn test_extend_overrides_identical_pattern_and_rejects_overlap() {
    let env = TypedEnvironment::standard();
    let base = env
        .define_typed("size", sigs(vec![("number", tag("old"))]))
        .unwrap();

    // Identical parameter pattern: a true override.
    let overridden =
        TypedFunction::extend(&base, &env, sigs(vec![("number", tag("new"))])).unwrap();
    assert_eq!(
        overridden.call(&[Value::Number(1.0)]).unwrap(),
        Value::Str("new".to_string())
    );
    assert_eq!(overridden.signatures().len(), 1);

    // A non-identical overlapping pattern is not an override.
    let result = TypedFunction::extend(&base, &env, sigs(vec![("number|string", tag("loose"))]));
    assert!(matches!(
        result,
        Err(DefineError::Build(BuildError::AmbiguousSignatures { .. }))
    ));
}

fn scalar_double(args: &[Value]) -> Result<Value, CallError> {
    let n = f64::try_from(&args[0])?;
    Ok(Value::Number(n * 2.0))
}

fn elementwise(me: SelfHandle) -> Implementation {
    Arc::new(move |args: &[Value]| match &args[0] {
        Value::Array(items) => {
            let mut mapped = Vec::with_capacity(items.len());
            for item in items {
                mapped.push(me.call(std::slice::from_ref(item))?);
            }
            Ok(Value::Array(mapped))
        }
        other => Err(CallError::evaluation(
            "double",
            format!("expected Array, got {}", other.type_name()),
        )),
    })
}

#[test]
fn test_self_reference_applies_scalar_path_elementwise() {
    let env = TypedEnvironment::standard();
    let mut builder = TypedFunctionBuilder::new("double");
    builder.signature("number", implementation(scalar_double));
    builder.signature("Array", refer_to_self(elementwise));
    let double = builder.build(&env, &DependencyBindings::default()).unwrap();

    assert_eq!(
        double
            .call(&[Value::Array(vec![
                Value::Number(1.0),
                Value::Number(2.0),
                Value::Number(3.0),
            ])])
            .unwrap(),
        Value::Array(vec![
            Value::Number(2.0),
            Value::Number(4.0),
            Value::Number(6.0),
        ])
    );

    // Nesting recurses through the same self handle.
    assert_eq!(
        double
            .call(&[Value::Array(vec![Value::Array(vec![Value::Number(5.0)])])])
            .unwrap(),
        Value::Array(vec![Value::Array(vec![Value::Number(10.0)])])
    );
}

#[test]
fn test_self_handle_is_unbound_during_construction() {
    let env = TypedEnvironment::standard();
    let mut builder = TypedFunctionBuilder::new("eager");
    builder.signature(
        "number",
        refer_to_self(|me: SelfHandle| -> Implementation {
            // Invoking the handle while the function is still being built
            // must fail instead of dispatching into a half-built table.
            let probe = me.call(&[Value::Number(1.0)]);
            assert!(matches!(
                probe,
                Err(CallError::UnboundSelfReference { ref function }) if function == "eager"
            ));
            Arc::new(|args: &[Value]| Ok(args[0].clone()))
        }),
    );
    let f = builder.build(&env, &DependencyBindings::default()).unwrap();
    // Once bound, the same handle dispatches normally.
    assert_eq!(f.call(&[Value::Number(9.0)]).unwrap(), Value::Number(9.0));
}

#[test]
fn test_extend_rebinds_self_references_to_the_derived_function() {
    let env = TypedEnvironment::standard();
    let mut builder = TypedFunctionBuilder::new("double");
    builder.signature("number", implementation(scalar_double));
    builder.signature("Array", refer_to_self(elementwise));
    let base = builder.build(&env, &DependencyBindings::default()).unwrap();

    // Override the scalar path; the elementwise path must see the override.
    let tripled = TypedFunction::extend(
        &base,
        &env,
        sigs(vec![(
            "number",
            implementation(|args: &[Value]| {
                let n = f64::try_from(&args[0])?;
                Ok(Value::Number(n * 3.0))
            }),
        )]),
    )
    .unwrap();

    assert_eq!(
        tripled
            .call(&[Value::Array(vec![Value::Number(1.0), Value::Number(2.0)])])
            .unwrap(),
        Value::Array(vec![Value::Number(3.0), Value::Number(6.0)])
    );
    // The base keeps doubling.
    assert_eq!(
        base.call(&[Value::Array(vec![Value::Number(1.0)])]).unwrap(),
        Value::Array(vec![Value::Number(2.0)])
    );
}

#[test]
fn test_refer_to_resolves_sibling_bodies() {
    let env = TypedEnvironment::standard();
    let mut builder = TypedFunctionBuilder::new("plus");
    builder.signature(
        "number, number",
        implementation(|args: &[Value]| {
            let (a, b) = (f64::try_from(&args[0])?, f64::try_from(&args[1])?);
            Ok(Value::Number(a + b))
        }),
    );
    builder.signature(
        "string, string",
        refer_to(&["number, number"], |bodies: &[Implementation]| -> Implementation {
            let add = bodies[0].clone();
            Arc::new(move |args: &[Value]| {
                let mut numbers = Vec::with_capacity(args.len());
                for arg in args {
                    let text = String::try_from(arg)?;
                    let parsed: f64 = text.parse().map_err(|_| {
                        CallError::evaluation("plus", format!("'{text}' is not numeric"))
                    })?;
                    numbers.push(Value::Number(parsed));
                }
                (add.as_ref())(&numbers)
            })
        }),
    );
    let plus = builder.build(&env, &DependencyBindings::default()).unwrap();

    assert_eq!(
        plus.call(&[Value::Str("2".to_string()), Value::Str("3".to_string())])
            .unwrap(),
        Value::Number(5.0)
    );
}

#[test]
fn test_refer_to_unknown_signature_fails_at_build() {
    let env = TypedEnvironment::standard();
    let mut builder = TypedFunctionBuilder::new("plus");
    builder.signature("number, number", tag("add"));
    builder.signature(
        "string",
        refer_to(&["BigNumber, BigNumber"], |bodies: &[Implementation]| {
            bodies[0].clone()
        }),
    );
    let result = builder.build(&env, &DependencyBindings::default());
    assert!(matches!(
        result,
        Err(DefineError::Build(BuildError::UnresolvedReference { reference, .. }))
            if reference == "BigNumber, BigNumber"
    ));
}

#[test]
fn test_required_dependency_is_injected_at_build_time() {
    let env = TypedEnvironment::standard();
    let multiply = env
        .define_typed(
            "multiply",
            sigs(vec![(
                "number, number",
                implementation(|args: &[Value]| {
                    let (a, b) = (f64::try_from(&args[0])?, f64::try_from(&args[1])?);
                    Ok(Value::Number(a * b))
                }),
            )]),
        )
        .unwrap();

    let mut builder = TypedFunctionBuilder::new("square");
    let dep = builder.dependency("multiply");
    builder.signature(
        "number",
        implementation(move |args: &[Value]| dep.call(&[args[0].clone(), args[0].clone()])),
    );

    // Absent required dependency: construction fails.
    let mut missing = TypedFunctionBuilder::new("square");
    let handle = missing.dependency("multiply");
    missing.signature(
        "number",
        implementation(move |args: &[Value]| handle.call(&[args[0].clone(), args[0].clone()])),
    );
    let result = missing.build(&env, &DependencyBindings::default());
    assert!(matches!(
        result,
        Err(DefineError::Build(BuildError::MissingDependency { dependency, .. }))
            if dependency == "multiply"
    ));

    // Bound dependency: calls route through the injected function.
    let bindings = DependencyBindings::new().with("multiply", multiply);
    let square = builder.build(&env, &bindings).unwrap();
    assert_eq!(square.call(&[Value::Number(4.0)]).unwrap(), Value::Number(16.0));

    let declared: Vec<&str> = square.dependencies().iter().map(|d| d.declared()).collect();
    assert_eq!(declared, vec!["multiply"]);
}

#[test]
fn test_optional_dependency_may_be_absent() {
    let env = TypedEnvironment::standard();
    let mut builder = TypedFunctionBuilder::new("render");
    let formatter = builder.dependency("?format");
    let probe = formatter.clone();
    builder.signature(
        "number",
        implementation(move |args: &[Value]| match probe.get() {
            Some(format) => format.call(args),
            None => Ok(Value::Str(args[0].to_string())),
        }),
    );
    let render = builder.build(&env, &DependencyBindings::default()).unwrap();

    assert_eq!(
        render.call(&[Value::Number(2.0)]).unwrap(),
        Value::Str("2".to_string())
    );
    assert!(formatter.get().is_none());
    assert!(matches!(
        formatter.call(&[Value::Number(2.0)]),
        Err(CallError::UnboundDependency { name }) if name == "format"
    ));

    let spec = &render.dependencies()[0];
    assert_eq!(spec.declared(), "?format");
    assert_eq!(spec.name(), "format");
    assert!(spec.is_optional());
}

#[test]
fn test_attributes_and_signature_metadata_are_exposed() {
    let env = TypedEnvironment::standard();
    let mut builder = TypedFunctionBuilder::new("concat");
    builder.attribute("isTransformFunction", true);
    builder.signature("string, ...string", tag("concat"));
    let concat = builder.build(&env, &DependencyBindings::default()).unwrap();

    assert_eq!(concat.attributes().get("isTransformFunction"), Some(true));
    assert_eq!(concat.attributes().get("isClass"), None);

    let details = concat.signature_details();
    assert_eq!(details.len(), 1);
    assert_eq!(details[0].source, "string, ...string");
    assert_eq!(details[0].min_arity, 2);
    assert_eq!(details[0].max_arity, None);
    assert_eq!(details[0].parameters[0].type_names, vec!["string"]);
    assert!(!details[0].parameters[0].variadic);
    assert!(details[0].parameters[1].variadic);
    assert_eq!(concat.arity_bounds(), (2, None));
}
