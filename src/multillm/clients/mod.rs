//! Provider specific [`ModelClient`](crate::model_client::ModelClient) implementations.
//!
//! Each submodule offers a concrete client that speaks a particular vendor's API while
//! conforming to the uniform `converse` contract.

pub mod common;

pub mod claude;
pub mod openai;
