use std::fmt::Write as _;
use std::io;

use pretty_assertions::assert_eq;

use super::*;

fn text(printer: CppPrinter<Vec<u8>>) -> String {
    String::from_utf8(printer.finish().unwrap()).unwrap()
}

#[test]
fn indent_applies_at_start_of_line_only() {
    let mut out = CppPrinter::new(Vec::new());
    writeln!(out, "int f() {{").unwrap();
    {
        let mut body = out.indent();
        write!(body, "return ").unwrap();
        writeln!(body, "1;").unwrap();
    }
    writeln!(out, "}}").unwrap();
    assert_eq!(text(out), "int f() {\n  return 1;\n}\n");
}

#[test]
fn embedded_newlines_are_indented() {
    let mut out = CppPrinter::new(Vec::new());
    {
        let mut inner = out.indent();
        let mut deeper = inner.indent();
        writeln!(deeper, "a,\nb").unwrap();
    }
    write!(out, "c").unwrap();
    assert_eq!(text(out), "    a,\n    b\nc");
}

#[test]
fn namespaces_open_in_order_and_close_in_reverse() {
    let mut out = CppPrinter::new(Vec::new());
    {
        let mut ns = out.namespace(&["geo", "shapes"], "NS");
        writeln!(ns, "int x;").unwrap();
    }
    assert_eq!(
        text(out),
        "namespace NSgeo {\n\
         \n\
         \x20 namespace NSshapes {\n\
         \n\
         \x20   int x;\n\
         \n\
         \x20 } // NSshapes\n\
         \n\
         } // NSgeo\n"
    );
}

#[test]
fn indent_unwinds_on_early_return() {
    fn body(out: &mut CppPrinter<Vec<u8>>) -> Result<(), ()> {
        let _guard = out.indent();
        Err(())
    }
    let mut out = CppPrinter::new(Vec::new());
    assert!(body(&mut out).is_err());
    write!(out, "x").unwrap();
    assert_eq!(text(out), "x");
}

struct Broken;

impl io::Write for Broken {
    fn write(&mut self, _: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Other, "disk full"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn io_errors_are_sticky() {
    let mut out = CppPrinter::new(Broken);
    assert!(write!(out, "a").is_err());
    assert!(write!(out, "b").is_err());
    let err = out.finish().err().unwrap();
    assert_eq!(err.to_string(), "disk full");
}
