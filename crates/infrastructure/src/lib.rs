pub mod database;
pub mod envelope;
pub mod in_memory_queue;
pub mod job_queue_factory;
pub mod message_queue;
pub mod platform_client;
pub mod redis_stream;

pub use database::*;
pub use envelope::JobEnvelope;
pub use in_memory_queue::InMemoryJobQueue;
pub use job_queue_factory::JobQueueFactory;
pub use message_queue::RabbitJobQueue;
pub use platform_client::HttpPlatformClient;
pub use redis_stream::RedisStreamJobQueue;
