//! End-to-end scenarios: source text in, stdout out, through the whole
//! parse -> codegen -> VM pipeline. Each mirrors one of the source
//! repo's snapshot programs (spec §8's numbered scenarios).

use std::rc::Rc;

use pl0_compiler::{Generator, Parser};
use pl0_runtime::{Vm, VmConfig};

fn run(source: &str) -> String {
    let program = Parser::parse(source).expect("source parses");
    let code = Generator::generate(&program.blocks).expect("well-formed AST compiles");
    let code: Rc<[_]> = code.into();
    let mut out = Vec::new();
    let mut vm = Vm::new(code, VmConfig::new().with_interactive(false), &mut out);
    vm.run().expect("program runs to completion");
    String::from_utf8(out).unwrap()
}

#[test]
fn square_writes_squares_one_through_one_hundred() {
    let source = "
        VAR x, squ;
        PROCEDURE square; BEGIN squ := x * x END;
        BEGIN
            x := 1;
            WHILE x <= 10 DO
            BEGIN
                CALL square;
                WRITE squ;
                x := x + 1
            END
        END.
    ";
    let expected: String = (1..=10).map(|x| format!("{}\n", x * x)).collect();
    assert_eq!(run(source), expected);
}

#[test]
fn nested_scope_resolves_variables_across_static_link_hops() {
    let source = "
        VAR a;
        PROCEDURE outer;
            var b;
            PROCEDURE inner;
                var c;
            BEGIN
                c := 3;
                WRITE a;
                WRITE b;
                WRITE c;
            END;
        BEGIN
            b := 2;
            WRITE a;
            WRITE b;
            CALL inner;
        END;
        PROCEDURE first;
        BEGIN
            WRITE a;
            call outer;
        END;
        BEGIN
            a := 1;
            CALL first;
        END.
    ";
    assert_eq!(run(source), "1\n1\n2\n1\n2\n3\n");
}

#[test]
fn primes_under_100() {
    let source = "
        const max = 100;
        var arg, ret;
        procedure isprime;
        var i;
        begin
            ret := 1;
            i := 2;
            while i < arg do
            begin
                if arg / i * i = arg then
                begin
                    ret := 0;
                    i := arg
                end;
                i := i + 1
            end
        end;
        procedure primes;
        begin
            arg := 2;
            while arg < max do
            begin
                call isprime;
                if ret = 1 then write arg;
                arg := arg + 1
            end
        end;
        call primes
        .
    ";
    let primes = [
        2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83,
        89, 97,
    ];
    let expected: String = primes.iter().map(|p| format!("{p}\n")).collect();
    assert_eq!(run(source), expected);
}

#[test]
fn recursive_factorial_with_parameters() {
    // PL/0 has no return values, so the textbook recursive factorial
    // accumulates into a global on the way back up the call chain: each
    // frame multiplies `result` by its own `n` only after the recursive
    // call (for the smaller `n`) has returned.
    let source = "
        var result;
        procedure fact(n);
        begin
            if n = 0 then result := 1;
            if n > 0 then
            begin
                call fact(n - 1);
                result := n * result
            end
        end;
        begin
            call fact(5);
            write result
        end.
    ";
    assert_eq!(run(source), "120\n");
}

#[test]
fn odd_predicate_true_and_false() {
    assert_eq!(run("begin if odd 7 then write 1 end."), "1\n");
    assert_eq!(run("begin if odd 6 then write 1 end."), "");
}

#[test]
fn integer_division_floors_toward_negative_infinity() {
    assert_eq!(run("begin write 7 / 2 end."), "3\n");
}

#[test]
fn precedence_and_associativity() {
    assert_eq!(run("begin write 1 + 2 * 3 end."), "7\n");
    assert_eq!(run("begin write (1 + 2) * 3 end."), "9\n");
}

#[test]
fn subtraction_is_left_associative() {
    // (10 - 3) - 2 = 5, not 10 - (3 - 2) = 9.
    assert_eq!(run("begin write 10 - 3 - 2 end."), "5\n");
}

#[test]
fn frame_discipline_survives_a_call_with_no_outer_side_effects() {
    let program = Parser::parse(
        "procedure noop; var t; begin t := 1 end; begin call noop; write 42 end.",
    )
    .unwrap();
    let code: Rc<[_]> = Generator::generate(&program.blocks).unwrap().into();
    let mut out = Vec::new();
    let mut vm = Vm::new(code, VmConfig::new().with_interactive(false), &mut out);
    let bp_before = vm.bp();
    vm.run().unwrap();
    assert_eq!(vm.bp(), bp_before);
}
