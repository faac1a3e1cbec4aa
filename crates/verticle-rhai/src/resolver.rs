//! Module resolution through the host loader.
//!
//! Scripts are packaged as host resources the engine's default file
//! resolver cannot see. `import "util" as u;` is therefore resolved through
//! the same [`ResourceLoader`] verticle scripts are read from. The loader is
//! held in a [`LoaderRoot`] so `init` can re-point it after the engine has
//! been built.

use parking_lot::RwLock;
use rhai::module_resolvers::ModuleResolver;
use rhai::{Engine, EvalAltResult, Module, Position, Scope};
use std::path::Path;
use std::sync::Arc;
use verticle_kernel::ResourceLoader;

/// Re-pointable reference to the host loader.
#[derive(Clone, Default)]
pub struct LoaderRoot(Arc<RwLock<Option<Arc<dyn ResourceLoader>>>>);

impl LoaderRoot {
    pub fn set(&self, loader: Arc<dyn ResourceLoader>) {
        *self.0.write() = Some(loader);
    }

    pub fn get(&self) -> Option<Arc<dyn ResourceLoader>> {
        self.0.read().clone()
    }

    pub fn is_set(&self) -> bool {
        self.0.read().is_some()
    }
}

/// Resource name for `path`, adding `extension` when it has none.
pub fn resource_name(path: &str, extension: &str) -> String {
    if Path::new(path).extension().is_some() {
        path.to_string()
    } else {
        format!("{path}.{extension}")
    }
}

pub(crate) struct LoaderModuleResolver {
    root: LoaderRoot,
    extension: String,
}

impl LoaderModuleResolver {
    pub(crate) fn new(root: LoaderRoot, extension: &str) -> Self {
        Self {
            root,
            extension: extension.to_string(),
        }
    }
}

impl ModuleResolver for LoaderModuleResolver {
    fn resolve(
        &self,
        engine: &Engine,
        _source: Option<&str>,
        path: &str,
        pos: Position,
    ) -> Result<Arc<Module>, Box<EvalAltResult>> {
        let not_found = || Box::new(EvalAltResult::ErrorModuleNotFound(path.to_string(), pos));
        let in_module = |err: Box<EvalAltResult>| {
            Box::new(EvalAltResult::ErrorInModule(path.to_string(), err, pos))
        };

        let loader = self.root.get().ok_or_else(not_found)?;
        let name = resource_name(path, &self.extension);
        let source = match loader.read(&name) {
            Ok(Some(source)) => source,
            Ok(None) => return Err(not_found()),
            Err(e) => return Err(in_module(e.to_string().into())),
        };

        let mut ast = engine.compile(source).map_err(|e| in_module(e.into()))?;
        ast.set_source(name.as_str());
        tracing::debug!(module = %name, "Resolved script module");

        let module = Module::eval_ast_as_new(Scope::new(), &ast, engine).map_err(in_module)?;
        Ok(Arc::new(module))
    }
}
