pub mod block;
pub mod db;
pub mod io;
pub mod layout;
pub mod ledger;
pub mod phylo;
