// Biblioteca de operações do banco VBSolution
// Expõe módulos para uso em testes e no binário `vbsolution-ops`

pub mod config;
pub mod migration;
pub mod services;
pub mod utils;
