//! Loop-carried types converge through bounded fixed-point iteration.

mod common;

use pretty_assertions::assert_eq;

#[test]
fn loop_reassignments_union_at_the_header() {
    let mut top_read = None;
    let (mut session, _interner) = common::session_from(|b| {
        // x = 0
        // while True:
        //     y = x          <- reads the loop-carried type
        //     if cond: x = 1
        //     else:    x = "s"
        let zero = b.int(0);
        let init = b.assign("x", zero);

        let x_top = b.name("x");
        let read_stmt = b.assign("y", x_top);

        let cond = b.name("cond");
        let one = b.int(1);
        let then_stmt = b.assign("x", one);
        let text = b.str_lit("s");
        let else_stmt = b.assign("x", text);
        let if_stmt = b.if_(cond, vec![then_stmt], vec![else_stmt]);

        let t = b.bool_lit(true);
        let loop_stmt = b.while_(t, vec![read_stmt, if_stmt]);

        let cond_true = b.bool_lit(true);
        let cond_init = b.assign("cond", cond_true);

        top_read = Some(x_top);
        vec![cond_init, init, loop_stmt]
    });

    // The union of the initializer and both loop-body assignments, reached
    // within the iteration bound rather than hanging on the cycle.
    assert_eq!(
        session.type_description(top_read.unwrap_or_default()),
        "int | str"
    );
}

#[test]
fn while_condition_narrows_the_body() {
    let mut body_read = None;
    let (mut session, _interner) = common::session_from(|b| {
        let int_name = b.name("int");
        let none = b.none();
        let ann = b.binary(tern_ir::BinaryOp::BitOr, int_name, none);
        let param = b.param("x", Some(ann));

        // while x is not None: y = x
        let x = b.name("x");
        let test = b.is_not_none(x);
        let x_body = b.name("x");
        let body_stmt = b.assign("y", x_body);
        let loop_stmt = b.while_(test, vec![body_stmt]);
        let def = b.def("f", vec![param], None, vec![loop_stmt]);

        body_read = Some(x_body);
        vec![def]
    });

    assert_eq!(session.type_description(body_read.unwrap_or_default()), "int");
}

#[test]
fn for_target_takes_element_type() {
    let mut target_read = None;
    let (mut session, _interner) = common::session_from(|b| {
        let list_name = b.name("list");
        let int_name = b.name("int");
        let ann = b.subscript(list_name, int_name);
        let param = b.param("items", Some(ann));

        let iter = b.name("items");
        let item = b.name("item");
        let body_stmt = b.assign("y", item);
        let for_stmt = b.for_("item", iter, vec![body_stmt]);
        let def = b.def("f", vec![param], None, vec![for_stmt]);

        target_read = Some(item);
        vec![def]
    });

    assert_eq!(
        session.type_description(target_read.unwrap_or_default()),
        "int"
    );
}
