//! Rule-gated diagnostics and their configuration.

mod common;

use pretty_assertions::assert_eq;
use rustc_hash::FxHashMap;
use tern_check::{CancellationToken, CheckOptions};
use tern_diagnostic::{Category, Rule, RuleConfig, RuleSeverity};
use tern_ir::{BinaryOp, MapResolver, ResolvedModule};

#[test]
fn optional_member_access_reported_once() {
    let (mut session, _interner) = common::session_from(|b| {
        let str_name = b.name("str");
        let none = b.none();
        let ann = b.binary(BinaryOp::BitOr, str_name, none);
        let param = b.param("x", Some(ann));

        let x = b.name("x");
        let access = b.attribute(x, "upper");
        let call = b.call(access, vec![]);
        let stmt = b.expr_stmt(call);
        let def = b.def("f", vec![param], None, vec![stmt]);
        vec![def]
    });

    let diags = common::check(&mut session);
    assert_eq!(diags.len(), 1, "expected one finding: {diags:?}");
    assert_eq!(diags[0].rule, Some(Rule::OptionalMemberAccess));
    assert!(diags[0].message.contains("upper"));
}

#[test]
fn narrowed_optional_member_access_is_clean() {
    let (mut session, _interner) = common::session_from(|b| {
        let str_name = b.name("str");
        let none = b.none();
        let ann = b.binary(BinaryOp::BitOr, str_name, none);
        let param = b.param("x", Some(ann));

        let x = b.name("x");
        let test = b.is_not_none(x);
        let x2 = b.name("x");
        let access = b.attribute(x2, "upper");
        let call = b.call(access, vec![]);
        let stmt = b.expr_stmt(call);
        let if_stmt = b.if_(test, vec![stmt], vec![]);
        let def = b.def("f", vec![param], None, vec![if_stmt]);
        vec![def]
    });

    let diags = common::check(&mut session);
    assert!(diags.is_empty(), "unexpected findings: {diags:?}");
}

#[test]
fn optional_call_reported() {
    let (mut session, _interner) = common::session_from(|b| {
        let none_ann = b.none();
        let param = b.param("cb", Some(none_ann));
        let cb = b.name("cb");
        let call = b.call(cb, vec![]);
        let stmt = b.expr_stmt(call);
        let def = b.def("f", vec![param], None, vec![stmt]);
        vec![def]
    });

    let diags = common::check(&mut session);
    assert_eq!(diags.len(), 1, "expected one finding: {diags:?}");
    assert_eq!(diags[0].rule, Some(Rule::OptionalCall));
}

#[test]
fn undefined_variable_reported_and_togglable() {
    let build = |b: &mut tern_ir::AstBuilder| {
        let ghost = b.name("ghost");
        vec![b.expr_stmt(ghost)]
    };

    let (mut session, _interner) = common::session_from(build);
    let diags = common::check(&mut session);
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].rule, Some(Rule::UndefinedVariable));
    assert_eq!(diags[0].category, Category::Error);

    // Severity none silences the rule entirely.
    let (mut session, _interner) = common::session_from(build);
    let mut rules = RuleConfig::default();
    rules.set(Rule::UndefinedVariable, RuleSeverity::None);
    let options = CheckOptions {
        rules,
        error_limit: 0,
    };
    let diags = common::check_with(&mut session, &options);
    assert!(diags.is_empty(), "unexpected findings: {diags:?}");
}

#[test]
fn severity_downgrade_to_warning() {
    let (mut session, _interner) = common::session_from(|b| {
        let ghost = b.name("ghost");
        vec![b.expr_stmt(ghost)]
    });
    let mut rules = RuleConfig::default();
    rules.set(Rule::UndefinedVariable, RuleSeverity::Warning);
    let options = CheckOptions {
        rules,
        error_limit: 0,
    };
    let diags = common::check_with(&mut session, &options);
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].category, Category::Warning);
}

#[test]
fn unnecessary_isinstance_reported() {
    let (mut session, _interner) = common::session_from(|b| {
        let int_ann = b.name("int");
        let param = b.param("x", Some(int_ann));
        let x = b.name("x");
        let int_ref = b.name("int");
        let test = b.isinstance(x, int_ref);
        let pass = b.pass();
        let if_stmt = b.if_(test, vec![pass], vec![]);
        let def = b.def("f", vec![param], None, vec![if_stmt]);
        vec![def]
    });

    let diags = common::check(&mut session);
    assert_eq!(diags.len(), 1, "expected one finding: {diags:?}");
    assert_eq!(diags[0].rule, Some(Rule::UnnecessaryIsInstance));
    assert_eq!(diags[0].category, Category::Warning);
}

#[test]
fn necessary_isinstance_is_clean() {
    let (mut session, _interner) = common::session_from(|b| {
        let int_name = b.name("int");
        let str_name = b.name("str");
        let ann = b.binary(BinaryOp::BitOr, int_name, str_name);
        let param = b.param("x", Some(ann));
        let x = b.name("x");
        let int_ref = b.name("int");
        let test = b.isinstance(x, int_ref);
        let pass = b.pass();
        let if_stmt = b.if_(test, vec![pass], vec![]);
        let def = b.def("f", vec![param], None, vec![if_stmt]);
        vec![def]
    });

    let diags = common::check(&mut session);
    assert!(diags.is_empty(), "unexpected findings: {diags:?}");
}

#[test]
fn annotated_assignment_mismatch() {
    let (mut session, _interner) = common::session_from(|b| {
        let int_ann = b.name("int");
        let text = b.str_lit("s");
        vec![b.assign_ann("x", int_ann, text)]
    });

    let diags = common::check(&mut session);
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].rule, Some(Rule::TypeMismatch));
    assert!(
        diags[0].message.contains("not assignable to declared type"),
        "message was: {}",
        diags[0].message
    );
}

#[test]
fn return_annotation_mismatch() {
    let (mut session, _interner) = common::session_from(|b| {
        let int_ann = b.name("int");
        let text = b.str_lit("s");
        let ret = b.return_(Some(text));
        let def = b.def("f", vec![], Some(int_ann), vec![ret]);
        vec![def]
    });

    let diags = common::check(&mut session);
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].rule, Some(Rule::TypeMismatch));
    assert!(diags[0].message.contains("return type"));
}

#[test]
fn binary_operand_mismatch() {
    let (mut session, _interner) = common::session_from(|b| {
        let int_ann = b.name("int");
        let pi = b.param("i", Some(int_ann));
        let str_ann = b.name("str");
        let ps = b.param("s", Some(str_ann));
        let i = b.name("i");
        let s = b.name("s");
        let sum = b.binary(BinaryOp::Add, i, s);
        let stmt = b.assign("r", sum);
        let def = b.def("f", vec![pi, ps], None, vec![stmt]);
        vec![def]
    });

    let diags = common::check(&mut session);
    assert_eq!(diags.len(), 1, "expected one finding: {diags:?}");
    assert_eq!(diags[0].rule, Some(Rule::TypeMismatch));
    assert!(diags[0].message.contains("operator \"+\""));
}

#[test]
fn incompatible_override_reported() {
    let (mut session, _interner) = common::session_from(|b| {
        // class A: def m(self, x: int) -> int: return x
        let self1 = b.param("self", None);
        let int_ann = b.name("int");
        let px = b.param("x", Some(int_ann));
        let ret_ann = b.name("int");
        let x_read = b.name("x");
        let ret = b.return_(Some(x_read));
        let m_a = b.def("m", vec![self1, px], Some(ret_ann), vec![ret]);
        let class_a = b.class_def("A", vec![], vec![m_a]);

        // class B(A): def m(self) -> int: return 1  -- drops a parameter
        let self2 = b.param("self", None);
        let ret_ann2 = b.name("int");
        let one = b.int(1);
        let ret2 = b.return_(Some(one));
        let m_b = b.def("m", vec![self2], Some(ret_ann2), vec![ret2]);
        let a_ref = b.name("A");
        let class_b = b.class_def("B", vec![a_ref], vec![m_b]);

        vec![class_a, class_b]
    });

    let diags = common::check(&mut session);
    assert_eq!(diags.len(), 1, "expected one finding: {diags:?}");
    assert_eq!(diags[0].rule, Some(Rule::IncompatibleOverride));
}

#[test]
fn compatible_override_is_clean() {
    let (mut session, _interner) = common::session_from(|b| {
        let self1 = b.param("self", None);
        let int_ann = b.name("int");
        let px = b.param("x", Some(int_ann));
        let ret_ann = b.name("int");
        let x_read = b.name("x");
        let ret = b.return_(Some(x_read));
        let m_a = b.def("m", vec![self1, px], Some(ret_ann), vec![ret]);
        let class_a = b.class_def("A", vec![], vec![m_a]);

        // Same shape, wider parameter: fine.
        let self2 = b.param("self", None);
        let obj_ann = b.name("object");
        let px2 = b.param("x", Some(obj_ann));
        let ret_ann2 = b.name("bool");
        let t = b.bool_lit(true);
        let ret2 = b.return_(Some(t));
        let m_b = b.def("m", vec![self2, px2], Some(ret_ann2), vec![ret2]);
        let a_ref = b.name("A");
        let class_b = b.class_def("B", vec![a_ref], vec![m_b]);

        vec![class_a, class_b]
    });

    let diags = common::check(&mut session);
    assert!(diags.is_empty(), "unexpected findings: {diags:?}");
}

#[test]
fn unresolved_import_reported() {
    let (mut session, _interner) = common::session_from(|b| {
        vec![b.import("missing_mod", None)]
    });

    let diags = common::check(&mut session);
    assert_eq!(diags.len(), 1);
    assert!(diags[0].message.contains("could not be resolved"));
    assert_eq!(diags[0].rule, None);
}

#[test]
fn resolved_import_exports_are_typed() {
    let interner = std::sync::Arc::new(tern_ir::StringInterner::new());
    let mut resolver = MapResolver::new();
    let mut exports = FxHashMap::default();
    exports.insert(interner.intern("sep"), "str".to_owned());
    exports.insert(interner.intern("level"), "int | None".to_owned());
    resolver.insert(ResolvedModule {
        name: interner.intern("os"),
        exports,
    });

    let mut b = tern_ir::AstBuilder::new(&interner);
    let import = b.import("os", None);
    let os_ref = b.name("os");
    let sep = b.attribute(os_ref, "sep");
    let stmt = b.assign("y", sep);
    let ast = b.finish(vec![import, stmt]);

    let mut session = tern_check::FileSession::new(
        "",
        ast,
        std::sync::Arc::clone(&interner),
        Box::new(resolver),
    );
    assert_eq!(session.type_description(sep), "str");
    let diags = common::check(&mut session);
    assert!(diags.is_empty(), "unexpected findings: {diags:?}");
}

#[test]
fn error_limit_filters_excess_errors() {
    let (mut session, _interner) = common::session_from(|b| {
        let a = b.name("ghost_a");
        let s1 = b.expr_stmt(a);
        let c = b.name("ghost_b");
        let s2 = b.expr_stmt(c);
        vec![s1, s2]
    });
    let options = CheckOptions {
        rules: RuleConfig::default(),
        error_limit: 1,
    };
    let diags = common::check_with(&mut session, &options);
    assert_eq!(diags.len(), 1);
}

#[test]
fn cancelled_pass_returns_control_signal() {
    let (mut session, _interner) = common::session_from(|b| {
        let one = b.int(1);
        vec![b.assign("x", one)]
    });
    let token = CancellationToken::new();
    token.cancel();
    let result = session.check_file(&CheckOptions::default(), &token);
    assert_eq!(result, Err(tern_check::AnalysisError::Cancelled));

    // The session stays reusable: a fresh pass succeeds.
    token.reset();
    let diags = match session.check_file(&CheckOptions::default(), &token) {
        Ok(d) => d,
        Err(e) => panic!("retry failed: {e}"),
    };
    assert!(diags.is_empty());
}
