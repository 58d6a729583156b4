//! End-to-end flows across endpoints, transport and C ABI.

mod c_abi;
mod security;
