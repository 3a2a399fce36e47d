/// Name of a raw CSV shard as discovered (zip entry path or file name).
/// Example: `dcinside-data-main/post-dataset/posts_0001.csv`
pub type ShardName = String;
/// A single extracted token.
/// Example: `날씨`
pub type Token = String;
/// Author display name as it appears in the dump.
/// Example: `ㅇㅇ(121.131)`
pub type AuthorName = String;
/// Lowercased host component of an outbound URL.
/// Example: `youtu.be`
pub type DomainName = String;
/// Path of an artifact relative to the data directory.
/// Examples: `main.csv`, `stats/top_tokens.csv`
pub type ArtifactPath = String;
