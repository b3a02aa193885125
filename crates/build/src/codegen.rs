//! Rust source emission for the embedded kernel registry

use crate::kernels::CompiledKernelModule;

/// Converts WGSL source into a Rust string literal
fn dump_string_literal(source: &str) -> String {
    let escaped = source.replace('\\', "\\\\").replace('"', "\\\"").replace('\r', "").replace('\n', "\\n");
    format!("\"{escaped}\"")
}

/// Generates the `kernels.rs` registry for a set of compiled modules
///
/// Each module becomes a `pub static <ID>: KernelModule`, so descriptors can
/// borrow it for `'static`, and `MODULES` lists all of them in manifest order.
/// The output expects `KernelModule` to be reachable as `crate::KernelModule`.
pub fn dump_kernel_registry(modules: &[CompiledKernelModule]) -> String {
    let mut code = String::new();
    code.push_str("// This file is generated by the build script.\n\n");
    code.push_str("use crate::KernelModule;\n\n");

    for module in modules {
        code.push_str(&format!(
            "/// `{}` {} module (entry points: {})\n",
            module.spec.id,
            module.spec.kind,
            module.entry_points.join(", ")
        ));
        code.push_str(&format!(
            "pub static {}: KernelModule = KernelModule::new(\"{}\", {});\n\n",
            module.spec.const_name(),
            module.spec.id,
            dump_string_literal(&module.source)
        ));
    }

    code.push_str("/// Every module listed in the kernel manifest\n");
    code.push_str("pub static MODULES: &[&KernelModule] = &[");
    code.push_str(&modules.iter().map(|module| format!("&{}", module.spec.const_name())).collect::<Vec<_>>().join(", "));
    code.push_str("];\n\n");

    code.push_str("// END OF GENERATED CODE\n");
    code
}
