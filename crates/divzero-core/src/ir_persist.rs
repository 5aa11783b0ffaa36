use crate::analysis::AnalysisResult;
use crate::module::Module;
use std::fs;
use std::io;
use std::path::Path;

pub fn save_module(module: &Module, path: impl AsRef<Path>) -> io::Result<()> {
    let json = serde_json::to_string_pretty(module)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    fs::write(path, json)?;
    Ok(())
}

pub fn load_module(path: impl AsRef<Path>) -> io::Result<Module> {
    let json = fs::read_to_string(path)?;
    let module =
        serde_json::from_str(&json).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    Ok(module)
}

/// Writes the per-instruction In/Out memories and diagnostics of one analysis run.
pub fn save_results(result: &AnalysisResult, path: impl AsRef<Path>) -> io::Result<()> {
    let json = serde_json::to_string_pretty(result)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::FunctionBuilder;
    use crate::types::Type;
    use crate::values::Value;
    use tempfile::NamedTempFile;

    #[test]
    fn test_save_load_module() {
        let mut func = FunctionBuilder::new("main", Type::i32());
        let mut entry = func.entry_block();
        let q = entry.sdiv(Value::int(10, 32), Value::int(2, 32), Type::i32());
        entry.return_value(Type::i32(), q).unwrap();

        let mut module = Module::new("persist");
        module.add_function(func.build().unwrap());

        let temp_file = NamedTempFile::new().unwrap();
        save_module(&module, temp_file.path()).unwrap();

        let loaded = load_module(temp_file.path()).unwrap();
        assert_eq!(loaded.name, "persist");
        let main = loaded.function("main").unwrap();
        assert_eq!(main.instruction_count(), 2);
        assert_eq!(main.divisions().count(), 1);
    }
}
