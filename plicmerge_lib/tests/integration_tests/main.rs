mod test_discovery;
mod test_formats;
mod test_merge;
