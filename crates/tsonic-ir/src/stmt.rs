//! IR statements and declarations.

use tsonic_common::Span;

use crate::expr::{IrExpr, IrParameter};
use crate::handles::DeclId;
use crate::types::TypeRef;

#[derive(Clone, Debug, PartialEq)]
pub struct IrStmt {
    pub kind: IrStmtKind,
    pub span: Span,
}

impl IrStmt {
    pub fn new(kind: IrStmtKind) -> Self {
        IrStmt {
            kind,
            span: Span::dummy(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum IrStmtKind {
    Expr(IrExpr),
    Var(IrVarDecl),
    Func(IrFunction),
    Class(IrClass),
    Interface(IrInterface),
    Enum(IrEnum),
    TypeAlias(IrTypeAlias),
    Block(Vec<IrStmt>),
    If {
        condition: IrExpr,
        then_branch: Box<IrStmt>,
        else_branch: Option<Box<IrStmt>>,
    },
    While {
        condition: IrExpr,
        body: Box<IrStmt>,
    },
    For {
        init: Option<Box<IrStmt>>,
        condition: Option<IrExpr>,
        update: Option<IrExpr>,
        body: Box<IrStmt>,
    },
    ForOf {
        binding: String,
        binding_decl: DeclId,
        element_type: TypeRef,
        iterable: IrExpr,
        body: Box<IrStmt>,
    },
    Switch {
        discriminant: IrExpr,
        cases: Vec<IrSwitchCase>,
    },
    Try {
        block: Vec<IrStmt>,
        catch: Option<IrCatch>,
        finally: Option<Vec<IrStmt>>,
    },
    Return(Option<IrExpr>),
    Throw(IrExpr),
    Break,
    Continue,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IrVarDecl {
    pub name: String,
    pub decl: DeclId,
    pub is_const: bool,
    pub declared_type: TypeRef,
    pub init: Option<IrExpr>,
    pub exported: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IrFunction {
    pub name: String,
    pub decl: DeclId,
    pub type_params: Vec<String>,
    pub params: Vec<IrParameter>,
    pub return_type: TypeRef,
    pub body: Vec<IrStmt>,
    pub is_async: bool,
    pub is_generator: bool,
    pub exported: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IrClass {
    pub name: String,
    pub decl: DeclId,
    pub type_params: Vec<String>,
    pub extends: Option<TypeRef>,
    pub implements: Vec<TypeRef>,
    pub members: Vec<IrClassMember>,
    pub exported: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum IrClassMember {
    Property {
        name: String,
        ty: TypeRef,
        init: Option<IrExpr>,
        is_static: bool,
        readonly: bool,
    },
    Method {
        name: String,
        type_params: Vec<String>,
        params: Vec<IrParameter>,
        return_type: TypeRef,
        body: Vec<IrStmt>,
        is_static: bool,
        is_async: bool,
        is_generator: bool,
    },
    Constructor {
        params: Vec<IrParameter>,
        body: Vec<IrStmt>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct IrInterface {
    pub name: String,
    pub decl: DeclId,
    pub type_params: Vec<String>,
    pub extends: Vec<TypeRef>,
    pub members: Vec<IrInterfaceMember>,
    pub exported: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum IrInterfaceMember {
    Property {
        name: String,
        ty: TypeRef,
        optional: bool,
    },
    Method {
        name: String,
        type_params: Vec<String>,
        params: Vec<IrParameter>,
        return_type: TypeRef,
    },
    Indexer {
        key: TypeRef,
        value: TypeRef,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct IrEnum {
    pub name: String,
    pub decl: DeclId,
    pub members: Vec<IrEnumMember>,
    pub exported: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IrEnumMember {
    pub name: String,
    pub value: Option<IrExpr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IrTypeAlias {
    pub name: String,
    pub decl: DeclId,
    pub ty: TypeRef,
    pub exported: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IrSwitchCase {
    pub test: Option<IrExpr>,
    pub body: Vec<IrStmt>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IrCatch {
    pub binding: Option<String>,
    pub body: Vec<IrStmt>,
}
