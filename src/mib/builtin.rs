//! The implicit `<builtin>` module: primitive type names, the `iso` root
//! arc, and the standard `OBJECT-TYPE`/`TRAP-TYPE` macros every MIB can use
//! without an explicit IMPORTS clause.

use super::Database;

const BUILTIN_SOURCE: &str = r#"
<builtin> DEFINITIONS ::= BEGIN

iso OBJECT IDENTIFIER ::= { 1 }

OBJECT-TYPE MACRO ::=
BEGIN
    TYPE NOTATION ::= "SYNTAX" value(SYNTAX ObjectSyntax) "MAX-ACCESS" value(ACCESS Access) "STATUS" value(STATUS Status) value(DESCRIPTION DescrPart) value(INDEX IndexPart) DefValPart
    VALUE NOTATION ::= value(VALUE ObjectName)
    Access ::= "read-only" | "read-write" | "read-create" | "accessible-for-notify" | "not-accessible"
    Status ::= "current" | "deprecated" | "obsolete"
    DescrPart ::= "DESCRIPTION" value(Description DisplayString) | empty
    IndexPart ::= "INDEX" "{" IndexTypes "}" | empty
    IndexTypes ::= IndexType | IndexTypes "," IndexType
    IndexType ::= value(Index ObjectName)
    DefValPart ::= "DEFVAL" "{" value(Defval ObjectSyntax) "}" | empty
END

TRAP-TYPE MACRO ::=
BEGIN
    TYPE NOTATION ::= "ENTERPRISE" value(Enterprise ObjectName) VarPart DescrPart
    VALUE NOTATION ::= value(VALUE Number)
    VarPart ::= "VARIABLES" "{" VarTypes "}" | empty
    VarTypes ::= VarType | VarTypes "," VarType
    VarType ::= value(Var ObjectName)
    DescrPart ::= "DESCRIPTION" value(Description DisplayString) | empty
END

END
"#;

pub(super) fn install(db: &mut Database) {
    let module = super::module::read_module("<builtin>", BUILTIN_SOURCE)
        .expect("the embedded <builtin> module must always parse");
    db.insert_module(module);
}
