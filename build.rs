use std::{
    env,
    fs,
    path::{Path, PathBuf},
};

use syn::{Expr, ExprLit, ExprMethodCall, File, Lit, visit::Visit};

#[derive(Debug, Clone)]
struct RouteEntry {
    method: String,
    path: String,
    handler: String,
    source: String,
}

struct RouteVisitor {
    source: String,
    routes: Vec<RouteEntry>,
}

impl<'ast> Visit<'ast> for RouteVisitor {
    fn visit_expr_method_call(&mut self, node: &'ast ExprMethodCall) {
        let method_name = node.method.to_string();
        if method_name == "route" {
            let path = node.args.first().and_then(extract_string_literal);
            let handlers = node
                .args
                .iter()
                .nth(1)
                .map(extract_handlers)
                .unwrap_or_default();
            if let Some(path) = path {
                let handlers = if handlers.is_empty() {
                    vec![("ROUTE".to_string(), String::new())]
                } else {
                    handlers
                };
                for (method, handler) in handlers {
                    self.routes.push(RouteEntry {
                        method,
                        path: path.clone(),
                        handler,
                        source: self.source.clone(),
                    });
                }
            } else {
                println!(
                    "cargo:warning=Skipping non-literal route path in {}",
                    self.source
                );
            }
        }

        syn::visit::visit_expr_method_call(self, node);
    }
}

fn extract_string_literal(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Str(value),
            ..
        }) => Some(value.value()),
        Expr::Paren(expr) => extract_string_literal(&expr.expr),
        Expr::Reference(expr) => extract_string_literal(&expr.expr),
        _ => None,
    }
}

/// `get(a).post(b)` → `[("GET", "a"), ("POST", "b")]`, in call order.
fn extract_handlers(expr: &Expr) -> Vec<(String, String)> {
    let mut calls = Vec::new();
    collect_method_calls(expr, &mut calls);
    calls.reverse();

    let mut handlers: Vec<(String, String)> = Vec::new();
    for (name, handler) in calls {
        if let Some(method) = normalize_method(&name) {
            if !handlers.iter().any(|(existing, _)| *existing == method) {
                handlers.push((method, handler));
            }
        }
    }

    handlers
}

fn collect_method_calls(expr: &Expr, out: &mut Vec<(String, String)>) {
    match expr {
        Expr::Call(call) => {
            let handler = call.args.first().map(handler_name).unwrap_or_default();
            match &*call.func {
                Expr::Path(path) => {
                    if let Some(segment) = path.path.segments.last() {
                        out.push((segment.ident.to_string(), handler));
                    }
                }
                Expr::Paren(expr) => collect_method_calls(&expr.expr, out),
                _ => {}
            }
        }
        Expr::MethodCall(method_call) => {
            let handler = method_call
                .args
                .first()
                .map(handler_name)
                .unwrap_or_default();
            out.push((method_call.method.to_string(), handler));
            collect_method_calls(&method_call.receiver, out);
        }
        Expr::Paren(expr) => collect_method_calls(&expr.expr, out),
        Expr::Reference(expr) => collect_method_calls(&expr.expr, out),
        _ => {}
    }
}

fn handler_name(expr: &Expr) -> String {
    match expr {
        Expr::Path(path) => path
            .path
            .segments
            .iter()
            .map(|segment| segment.ident.to_string())
            .collect::<Vec<_>>()
            .join("::"),
        Expr::Closure(_) => "<closure>".to_string(),
        _ => String::new(),
    }
}

const METHODS: &[&str] = &["get", "post", "put", "delete", "patch", "head", "options", "any"];

fn normalize_method(name: &str) -> Option<String> {
    METHODS
        .iter()
        .find(|method| name.eq_ignore_ascii_case(method))
        .map(|method| method.to_ascii_uppercase())
}

fn escape_rust_string(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

fn parse_file(path: &Path, manifest_dir: &Path) -> Vec<RouteEntry> {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|err| panic!("failed to read {}: {}", path.display(), err));
    let parsed: File = syn::parse_file(&content)
        .unwrap_or_else(|err| panic!("failed to parse {}: {}", path.display(), err));
    let source = path
        .strip_prefix(manifest_dir)
        .unwrap_or(path)
        .display()
        .to_string();
    let mut visitor = RouteVisitor {
        source,
        routes: Vec::new(),
    };
    visitor.visit_file(&parsed);
    visitor.routes
}

fn collect_route_files(dir: &Path, files: &mut Vec<PathBuf>) {
    let entries = fs::read_dir(dir)
        .unwrap_or_else(|err| panic!("failed to read {}: {}", dir.display(), err));
    for entry in entries {
        let entry = entry.unwrap_or_else(|err| panic!("failed to read dir entry: {}", err));
        let path = entry.path();
        if path.is_dir() {
            collect_route_files(&path, files);
        } else if path.extension().and_then(|ext| ext.to_str()) == Some("rs") {
            files.push(path);
        }
    }
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = env::var("CARGO_MANIFEST_DIR").expect("missing CARGO_MANIFEST_DIR");
    let manifest_path = Path::new(&manifest_dir);
    let routes_dir = manifest_path.join("src/routes");

    let mut files = Vec::new();
    collect_route_files(&routes_dir, &mut files);
    files.sort();
    println!("cargo:rerun-if-changed={}", routes_dir.display());
    for file in &files {
        println!("cargo:rerun-if-changed={}", file.display());
    }

    let mut routes = Vec::new();
    for file in files {
        routes.extend(parse_file(&file, manifest_path));
    }

    routes.sort_by(|a, b| a.path.cmp(&b.path).then(a.method.cmp(&b.method)));

    let out_dir = env::var("OUT_DIR").expect("missing OUT_DIR");
    let out_path = Path::new(&out_dir).join("routes_generated.rs");
    let mut output = String::from("pub static ROUTES: &[RouteInfo] = &[\n");
    for route in routes {
        output.push_str(&format!(
            "    RouteInfo {{ method: \"{}\", path: \"{}\", handler: \"{}\", source: \"{}\" }},\n",
            escape_rust_string(&route.method),
            escape_rust_string(&route.path),
            escape_rust_string(&route.handler),
            escape_rust_string(&route.source)
        ));
    }
    output.push_str("];\n");

    fs::write(&out_path, output)
        .unwrap_or_else(|err| panic!("failed to write {}: {}", out_path.display(), err));
}
